use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::{contains_ci, ensure_non_negative, PageRequest, Paged};
use crate::{
    entities::{
        bom_header::{self, Entity as BomHeaderEntity},
        count_product::{self, Entity as CountProductEntity},
        dyeing_order::{self, Entity as DyeingOrderEntity},
        work_order::{self, Entity as WorkOrderEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCountProduct {
    #[validate(length(min = 1, max = 32))]
    pub count_name: String,
    #[validate(length(min = 1, max = 64))]
    pub yarn_type: String,
    pub quality: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub rate_per_kg: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCountProduct {
    #[validate(length(min = 1, max = 32))]
    pub count_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub yarn_type: Option<String>,
    pub quality: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub rate_per_kg: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CountProductFilter {
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct CountProductService {
    db: Arc<DatabaseConnection>,
}

impl CountProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &CountProductFilter,
        page: PageRequest,
    ) -> Result<Paged<count_product::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(active) = filter.active {
            condition = condition.add(count_product::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let term = search.trim();
            condition = condition.add(
                Condition::any()
                    .add(contains_ci(count_product::Column::CountName, term))
                    .add(contains_ci(count_product::Column::YarnType, term))
                    .add(contains_ci(count_product::Column::Quality, term)),
            );
        }

        let query = CountProductEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(count_product::Column::CountName)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    pub async fn get(&self, id: i32) -> Result<count_product::Model, ServiceError> {
        CountProductEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("count product", id))
    }

    async fn ensure_unique_name(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query =
            CountProductEntity::find().filter(count_product::Column::CountName.eq(name));
        if let Some(id) = except {
            query = query.filter(count_product::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "count product '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(count_name = %input.count_name))]
    pub async fn create(
        &self,
        input: CreateCountProduct,
    ) -> Result<count_product::Model, ServiceError> {
        input.validate()?;
        if let Some(rate) = input.rate_per_kg {
            ensure_non_negative("rate_per_kg", rate)?;
        }
        let name = input.count_name.trim().to_string();
        self.ensure_unique_name(&name, None).await?;

        let now = Utc::now();
        let product = count_product::ActiveModel {
            count_name: Set(name),
            yarn_type: Set(input.yarn_type),
            quality: Set(input.quality),
            description: Set(input.description),
            rate_per_kg: Set(input.rate_per_kg),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(id = product.id, "Count product created");
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: UpdateCountProduct,
    ) -> Result<count_product::Model, ServiceError> {
        input.validate()?;
        if let Some(rate) = input.rate_per_kg {
            ensure_non_negative("rate_per_kg", rate)?;
        }
        let current = self.get(id).await?;
        let mut active: count_product::ActiveModel = current.into();

        if let Some(name) = input.count_name {
            let name = name.trim().to_string();
            self.ensure_unique_name(&name, Some(id)).await?;
            active.count_name = Set(name);
        }
        if let Some(yarn_type) = input.yarn_type {
            active.yarn_type = Set(yarn_type);
        }
        if let Some(quality) = input.quality {
            active.quality = Set(Some(quality));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(rate) = input.rate_per_kg {
            active.rate_per_kg = Set(Some(rate));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let product = self.get(id).await?;
        let db = &*self.db;
        let references = [
            (
                "dyeing order",
                DyeingOrderEntity::find()
                    .filter(dyeing_order::Column::CountProductId.eq(id))
                    .count(db)
                    .await?,
            ),
            (
                "work order",
                WorkOrderEntity::find()
                    .filter(work_order::Column::CountProductId.eq(id))
                    .count(db)
                    .await?,
            ),
            (
                "BOM",
                BomHeaderEntity::find()
                    .filter(bom_header::Column::CountProductId.eq(id))
                    .count(db)
                    .await?,
            ),
        ];
        if let Some(usage) = describe_references(&references) {
            return Err(ServiceError::Conflict(format!(
                "count product '{}' is used by {}",
                product.count_name, usage
            )));
        }

        CountProductEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "Count product deleted");
        Ok(())
    }
}

/// "2 dyeing order(s), 1 BOM(s)" for the non-zero counts, or `None`
fn describe_references(references: &[(&str, u64)]) -> Option<String> {
    let parts: Vec<String> = references
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(what, count)| format!("{} {}(s)", count, what))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_list_only_non_zero_counts() {
        assert_eq!(
            describe_references(&[("dyeing order", 0), ("work order", 2), ("BOM", 1)]),
            Some("2 work order(s), 1 BOM(s)".to_string())
        );
        assert_eq!(describe_references(&[("dyeing order", 0)]), None);
    }
}
