use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::{checked, ensure_non_negative, ensure_positive, round_dp, PageRequest, Paged};
use crate::{
    entities::{
        bom_header::{self, Entity as BomHeaderEntity},
        bom_line::{self, Entity as BomLineEntity},
        count_product::Entity as CountProductEntity,
        inventory_item::{self, Entity as InventoryItemEntity},
    },
    errors::ServiceError,
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BomLineInput {
    pub inventory_item_id: i32,
    #[schema(value_type = f64)]
    pub quantity_per_batch: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub wastage_percent: Decimal,
}

impl BomLineInput {
    fn check(&self) -> Result<(), ServiceError> {
        ensure_positive("quantity_per_batch", self.quantity_per_batch)?;
        ensure_non_negative("wastage_percent", self.wastage_percent)?;
        if self.wastage_percent > HUNDRED {
            return Err(ServiceError::ValidationError(
                "wastage_percent must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBom {
    #[validate(length(min = 1, max = 64))]
    pub bom_code: String,
    #[validate(length(min = 1, max = 200))]
    pub product_name: String,
    pub count_product_id: Option<i32>,
    #[schema(value_type = f64)]
    pub output_quantity_kg: Decimal,
    #[validate(length(min = 1, max = 16))]
    pub revision: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub lines: Vec<BomLineInput>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBom {
    #[validate(length(min = 1, max = 200))]
    pub product_name: Option<String>,
    pub count_product_id: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub output_quantity_kg: Option<Decimal>,
    #[validate(length(min = 1, max = 16))]
    pub revision: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BomFilter {
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BomLineView {
    #[serde(flatten)]
    pub line: bom_line::Model,
    pub sku: String,
    pub item_name: String,
    pub unit_of_measure: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BomDetail {
    #[serde(flatten)]
    pub header: bom_header::Model,
    pub lines: Vec<BomLineView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequirementLine {
    pub line_id: i32,
    pub inventory_item_id: i32,
    pub sku: String,
    pub item_name: String,
    pub unit_of_measure: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity_per_batch: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub wastage_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub required: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub available: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub shortage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BomRequirements {
    pub bom_id: i32,
    pub bom_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    pub lines: Vec<RequirementLine>,
    pub can_produce: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostLine {
    pub inventory_item_id: i32,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub required: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BomCost {
    pub bom_id: i32,
    pub bom_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    pub lines: Vec<CostLine>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub material_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub cost_per_kg: Decimal,
}

/// Material needed to make `quantity` kg from a line sized for `output_kg`,
/// wastage included, rounded to 3 decimals.
pub fn required_quantity(
    quantity: Decimal,
    output_kg: Decimal,
    per_batch: Decimal,
    wastage_percent: Decimal,
) -> Result<Decimal, ServiceError> {
    if output_kg <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let required = quantity
        .checked_mul(per_batch)
        .and_then(|v| v.checked_mul(HUNDRED + wastage_percent))
        .and_then(|v| v.checked_div(output_kg))
        .and_then(|v| v.checked_div(HUNDRED));
    Ok(round_dp(checked(required, "required quantity")?, 3))
}

/// Per-line requirements against current stock
pub fn compute_requirements(
    header: &bom_header::Model,
    lines: &[(bom_line::Model, inventory_item::Model)],
    quantity: Decimal,
) -> Result<BomRequirements, ServiceError> {
    let lines = lines
        .iter()
        .map(|(line, item)| {
            let required = required_quantity(
                quantity,
                header.output_quantity_kg,
                line.quantity_per_batch,
                line.wastage_percent,
            )?;
            let available = round_dp(item.quantity, 3);
            Ok(RequirementLine {
                line_id: line.id,
                inventory_item_id: item.id,
                sku: item.sku.clone(),
                item_name: item.name.clone(),
                unit_of_measure: item.unit_of_measure.clone(),
                quantity_per_batch: line.quantity_per_batch,
                wastage_percent: line.wastage_percent,
                required,
                available,
                shortage: (required - available).max(Decimal::ZERO),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    Ok(BomRequirements {
        bom_id: header.id,
        bom_code: header.bom_code.clone(),
        quantity,
        can_produce: lines.iter().all(|l| l.shortage.is_zero()),
        lines,
    })
}

/// Material cost of producing `quantity` kg at current unit costs
pub fn compute_cost(
    header: &bom_header::Model,
    lines: &[(bom_line::Model, inventory_item::Model)],
    quantity: Decimal,
) -> Result<BomCost, ServiceError> {
    let lines = lines
        .iter()
        .map(|(line, item)| {
            let required = required_quantity(
                quantity,
                header.output_quantity_kg,
                line.quantity_per_batch,
                line.wastage_percent,
            )?;
            let cost = checked(required.checked_mul(item.unit_cost), "line cost")?;
            Ok(CostLine {
                inventory_item_id: item.id,
                sku: item.sku.clone(),
                required,
                unit_cost: item.unit_cost,
                cost: round_dp(cost, 2),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    let material_cost = checked(
        lines
            .iter()
            .try_fold(Decimal::ZERO, |total, l| total.checked_add(l.cost)),
        "material cost",
    )?;
    let cost_per_kg = if quantity > Decimal::ZERO {
        round_dp(material_cost / quantity, 2)
    } else {
        Decimal::ZERO
    };

    Ok(BomCost {
        bom_id: header.id,
        bom_code: header.bom_code.clone(),
        quantity,
        lines,
        material_cost,
        cost_per_kg,
    })
}

/// Bills of materials and their lines
#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
}

impl BomService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &BomFilter,
        page: PageRequest,
    ) -> Result<Paged<bom_header::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(active) = filter.active {
            condition = condition.add(bom_header::Column::IsActive.eq(active));
        }

        let query = BomHeaderEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(bom_header::Column::BomCode)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    async fn header<C: ConnectionTrait>(conn: &C, id: i32) -> Result<bom_header::Model, ServiceError> {
        BomHeaderEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("BOM", id))
    }

    async fn lines_with_items<C: ConnectionTrait>(
        conn: &C,
        bom_id: i32,
    ) -> Result<Vec<(bom_line::Model, inventory_item::Model)>, ServiceError> {
        let rows = BomLineEntity::find()
            .filter(bom_line::Column::BomId.eq(bom_id))
            .find_also_related(InventoryItemEntity)
            .order_by_asc(bom_line::Column::Id)
            .all(conn)
            .await?;

        rows.into_iter()
            .map(|(line, item)| {
                let item_id = line.inventory_item_id;
                item.map(|item| (line, item))
                    .ok_or_else(|| ServiceError::not_found("inventory item", item_id))
            })
            .collect()
    }

    pub async fn get(&self, id: i32) -> Result<BomDetail, ServiceError> {
        let header = Self::header(&*self.db, id).await?;
        let lines = Self::lines_with_items(&*self.db, id).await?;
        Ok(BomDetail {
            header,
            lines: lines
                .into_iter()
                .map(|(line, item)| BomLineView {
                    line,
                    sku: item.sku,
                    item_name: item.name,
                    unit_of_measure: item.unit_of_measure,
                })
                .collect(),
        })
    }

    async fn ensure_count_product(&self, id: Option<i32>) -> Result<(), ServiceError> {
        if let Some(id) = id {
            CountProductEntity::find_by_id(id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("count product", id))?;
        }
        Ok(())
    }

    async fn insert_line<C: ConnectionTrait>(
        conn: &C,
        bom_id: i32,
        line: &BomLineInput,
    ) -> Result<bom_line::Model, ServiceError> {
        InventoryItemEntity::find_by_id(line.inventory_item_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory item", line.inventory_item_id))?;

        Ok(bom_line::ActiveModel {
            bom_id: Set(bom_id),
            inventory_item_id: Set(line.inventory_item_id),
            quantity_per_batch: Set(line.quantity_per_batch),
            wastage_percent: Set(line.wastage_percent),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await?)
    }

    /// Create the header and all lines in one transaction
    #[instrument(skip(self, input), fields(bom_code = %input.bom_code, lines = input.lines.len()))]
    pub async fn create(&self, input: CreateBom) -> Result<BomDetail, ServiceError> {
        input.validate()?;
        ensure_positive("output_quantity_kg", input.output_quantity_kg)?;
        let mut seen = HashSet::new();
        for line in &input.lines {
            line.check()?;
            if !seen.insert(line.inventory_item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "inventory item {} appears more than once",
                    line.inventory_item_id
                )));
            }
        }
        self.ensure_count_product(input.count_product_id).await?;

        let code = input.bom_code.trim().to_uppercase();
        let txn = self.db.begin().await?;
        let taken = BomHeaderEntity::find()
            .filter(bom_header::Column::BomCode.eq(code.as_str()))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!("BOM '{}' already exists", code)));
        }

        let now = Utc::now();
        let header = bom_header::ActiveModel {
            bom_code: Set(code),
            product_name: Set(input.product_name.trim().to_string()),
            count_product_id: Set(input.count_product_id),
            output_quantity_kg: Set(input.output_quantity_kg),
            revision: Set(input.revision.unwrap_or_else(|| "A".to_string())),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for line in &input.lines {
            Self::insert_line(&txn, header.id, line).await?;
        }
        txn.commit().await?;

        info!(id = header.id, "BOM created");
        self.get(header.id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: UpdateBom) -> Result<BomDetail, ServiceError> {
        input.validate()?;
        if let Some(output) = input.output_quantity_kg {
            ensure_positive("output_quantity_kg", output)?;
        }
        self.ensure_count_product(input.count_product_id).await?;

        let header = Self::header(&*self.db, id).await?;
        let mut active: bom_header::ActiveModel = header.into();
        if let Some(name) = input.product_name {
            active.product_name = Set(name.trim().to_string());
        }
        if let Some(product) = input.count_product_id {
            active.count_product_id = Set(Some(product));
        }
        if let Some(output) = input.output_quantity_kg {
            active.output_quantity_kg = Set(output);
        }
        if let Some(revision) = input.revision {
            active.revision = Set(revision);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.get(id).await
    }

    #[instrument(skip(self, input), fields(item_id = input.inventory_item_id))]
    pub async fn add_line(&self, bom_id: i32, input: BomLineInput) -> Result<BomDetail, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        Self::header(&txn, bom_id).await?;

        let existing = BomLineEntity::find()
            .filter(bom_line::Column::BomId.eq(bom_id))
            .filter(bom_line::Column::InventoryItemId.eq(input.inventory_item_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(ServiceError::ValidationError(format!(
                "inventory item {} is already on this BOM",
                input.inventory_item_id
            )));
        }

        Self::insert_line(&txn, bom_id, &input).await?;
        txn.commit().await?;
        self.get(bom_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_line(&self, bom_id: i32, line_id: i32) -> Result<BomDetail, ServiceError> {
        let result = BomLineEntity::delete_many()
            .filter(bom_line::Column::Id.eq(line_id))
            .filter(bom_line::Column::BomId.eq(bom_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "BOM line {} on BOM {}",
                line_id, bom_id
            )));
        }
        self.get(bom_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        Self::header(&txn, id).await?;
        BomLineEntity::delete_many()
            .filter(bom_line::Column::BomId.eq(id))
            .exec(&txn)
            .await?;
        BomHeaderEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        info!(id, "BOM deleted");
        Ok(())
    }

    pub async fn requirements(
        &self,
        id: i32,
        quantity: Decimal,
    ) -> Result<BomRequirements, ServiceError> {
        ensure_positive("quantity", quantity)?;
        let header = Self::header(&*self.db, id).await?;
        let lines = Self::lines_with_items(&*self.db, id).await?;
        compute_requirements(&header, &lines, quantity)
    }

    pub async fn cost(&self, id: i32, quantity: Decimal) -> Result<BomCost, ServiceError> {
        ensure_positive("quantity", quantity)?;
        let header = Self::header(&*self.db, id).await?;
        let lines = Self::lines_with_items(&*self.db, id).await?;
        compute_cost(&header, &lines, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::inventory_item::ItemCategory;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn header(output: Decimal) -> bom_header::Model {
        bom_header::Model {
            id: 1,
            bom_code: "BOM-30S-CW".to_string(),
            product_name: "30s combed weft".to_string(),
            count_product_id: None,
            output_quantity_kg: output,
            revision: "A".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(id: i32, item: &inventory_item::Model, per_batch: Decimal, wastage: Decimal) -> (bom_line::Model, inventory_item::Model) {
        (
            bom_line::Model {
                id,
                bom_id: 1,
                inventory_item_id: item.id,
                quantity_per_batch: per_batch,
                wastage_percent: wastage,
                created_at: Utc::now(),
            },
            item.clone(),
        )
    }

    fn item(id: i32, sku: &str, quantity: Decimal, unit_cost: Decimal) -> inventory_item::Model {
        inventory_item::Model {
            id,
            sku: sku.to_string(),
            name: sku.to_lowercase(),
            category: ItemCategory::RawMaterial,
            unit_of_measure: "kg".to_string(),
            quantity,
            reorder_level: Decimal::ZERO,
            unit_cost,
            location: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn required_scales_with_wastage() {
        let req = |q, o, p, w| required_quantity(q, o, p, w).unwrap();
        assert_eq!(req(dec!(500), dec!(100), dec!(110), dec!(0)), dec!(550));
        assert_eq!(req(dec!(500), dec!(100), dec!(110), dec!(2)), dec!(561));
        assert_eq!(req(dec!(1), dec!(3), dec!(1), dec!(0)), dec!(0.333));
        assert_eq!(req(dec!(10), dec!(0), dec!(1), dec!(0)), dec!(0));
    }

    #[test]
    fn oversized_requirements_are_rejected() {
        assert!(matches!(
            required_quantity(Decimal::MAX, dec!(0.0001), dec!(1000), dec!(0)),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn shortages_block_production() {
        let cotton = item(1, "COTTON", dec!(400), dec!(150));
        let cones = item(2, "CONE", dec!(1000), dec!(2.5));
        let lines = vec![
            line(1, &cotton, dec!(110), dec!(2)),
            line(2, &cones, dec!(50), dec!(0)),
        ];

        let req = compute_requirements(&header(dec!(100)), &lines, dec!(500)).unwrap();
        assert!(!req.can_produce);
        assert_eq!(req.lines[0].required, dec!(561));
        assert_eq!(req.lines[0].shortage, dec!(161));
        assert_eq!(req.lines[1].required, dec!(250));
        assert_eq!(req.lines[1].shortage, dec!(0));

        let small = compute_requirements(&header(dec!(100)), &lines, dec!(100)).unwrap();
        assert!(small.can_produce);
    }

    #[test]
    fn cost_sums_lines_and_divides_by_quantity() {
        let cotton = item(1, "COTTON", dec!(0), dec!(150));
        let cones = item(2, "CONE", dec!(0), dec!(2.5));
        let lines = vec![
            line(1, &cotton, dec!(110), dec!(0)),
            line(2, &cones, dec!(50), dec!(0)),
        ];

        let cost = compute_cost(&header(dec!(100)), &lines, dec!(200)).unwrap();
        assert_eq!(cost.lines[0].cost, dec!(33000));
        assert_eq!(cost.lines[1].cost, dec!(250));
        assert_eq!(cost.material_cost, dec!(33250));
        assert_eq!(cost.cost_per_kg, dec!(166.25));
    }

    #[test]
    fn empty_bom_can_always_be_produced() {
        let req = compute_requirements(&header(dec!(50)), &[], dec!(10)).unwrap();
        assert!(req.can_produce);
        assert!(req.lines.is_empty());
    }

    proptest! {
        #[test]
        fn shortage_is_never_negative(
            quantity in 1i64..5_000_000,
            per_batch in 1i64..500_000,
            wastage in 0i64..10_000,
            stock in 0i64..10_000_000,
        ) {
            let stock_item = item(1, "ITEM", Decimal::new(stock, 3), dec!(1));
            let lines = vec![line(1, &stock_item, Decimal::new(per_batch, 3), Decimal::new(wastage, 2))];
            let req = compute_requirements(&header(dec!(100)), &lines, Decimal::new(quantity, 3)).unwrap();
            let l = &req.lines[0];
            prop_assert!(l.shortage >= Decimal::ZERO);
            prop_assert!(l.shortage <= l.required);
            prop_assert_eq!(req.can_produce, l.shortage.is_zero());
        }
    }
}
