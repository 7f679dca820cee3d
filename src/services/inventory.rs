use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{checked, contains_ci, ensure_non_negative, round_dp, PageRequest, Paged};
use crate::{
    entities::{
        bom_line::{self, Entity as BomLineEntity},
        inventory_item::{self, Entity as InventoryItemEntity, ItemCategory},
        inventory_transaction::{self, Entity as TransactionEntity, TransactionKind},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItem {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category: ItemCategory,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    /// Opening stock; recorded as an `opening` ledger row when non-zero
    #[serde(default)]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub reorder_level: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub unit_cost: Decimal,
    pub location: Option<String>,
}

/// Everything except `quantity`, which only moves through adjustments
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryItem {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub reorder_level: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub unit_cost: Option<Decimal>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Receive,
    Issue,
    Set,
}

impl From<AdjustmentKind> for TransactionKind {
    fn from(kind: AdjustmentKind) -> Self {
        match kind {
            AdjustmentKind::Receive => TransactionKind::Receive,
            AdjustmentKind::Issue => TransactionKind::Issue,
            AdjustmentKind::Set => TransactionKind::Set,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StockAdjustment {
    pub kind: AdjustmentKind,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub category: Option<ItemCategory>,
    pub search: Option<String>,
    pub low_stock: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustmentResult {
    pub item: inventory_item::Model,
    pub transaction: inventory_transaction::Model,
}

/// New balance after applying an adjustment to `current`.
///
/// Returns the balance and the signed change, or `InsufficientStock` when an
/// issue would take the balance below zero.
pub fn apply_adjustment(
    current: Decimal,
    kind: AdjustmentKind,
    quantity: Decimal,
) -> Result<(Decimal, Decimal), ServiceError> {
    ensure_non_negative("quantity", quantity)?;
    let balance = match kind {
        AdjustmentKind::Receive => checked(current.checked_add(quantity), "stock balance")?,
        AdjustmentKind::Issue => {
            if quantity > current {
                return Err(ServiceError::InsufficientStock(format!(
                    "cannot issue {} with only {} on hand",
                    quantity, current
                )));
            }
            current - quantity
        }
        AdjustmentKind::Set => quantity,
    };
    let balance = round_dp(balance, 3);
    ensure_non_negative("balance", balance)?;
    Ok((balance, round_dp(balance - current, 3)))
}

/// Inventory items and their stock ledger
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &InventoryFilter,
        page: PageRequest,
    ) -> Result<Paged<inventory_item::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(category) = filter.category {
            condition = condition.add(inventory_item::Column::Category.eq(category));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(contains_ci(inventory_item::Column::Sku, search))
                    .add(contains_ci(inventory_item::Column::Name, search)),
            );
        }
        if filter.low_stock == Some(true) {
            condition = condition.add(
                sea_orm::sea_query::Expr::col(inventory_item::Column::Quantity)
                    .lte(sea_orm::sea_query::Expr::col(inventory_item::Column::ReorderLevel)),
            );
        }

        let query = InventoryItemEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(inventory_item::Column::Sku)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    /// Items at or below their reorder level, lowest relative stock first
    pub async fn low_stock(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let mut items = InventoryItemEntity::find()
            .filter(
                sea_orm::sea_query::Expr::col(inventory_item::Column::Quantity)
                    .lte(sea_orm::sea_query::Expr::col(inventory_item::Column::ReorderLevel)),
            )
            .order_by_asc(inventory_item::Column::Sku)
            .all(&*self.db)
            .await?;
        items.sort_by(|a, b| {
            let gap = |i: &inventory_item::Model| i.quantity - i.reorder_level;
            gap(a).cmp(&gap(b))
        });
        Ok(items)
    }

    pub async fn get(&self, id: i32) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory item", id))
    }

    async fn ensure_sku_free<C: ConnectionTrait>(
        conn: &C,
        sku: &str,
        except: Option<i32>,
    ) -> Result<(), ServiceError> {
        let mut query = InventoryItemEntity::find().filter(inventory_item::Column::Sku.eq(sku));
        if let Some(id) = except {
            query = query.filter(inventory_item::Column::Id.ne(id));
        }
        if query.count(conn).await? > 0 {
            return Err(ServiceError::Conflict(format!("sku '{}' already exists", sku)));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(
        &self,
        input: CreateInventoryItem,
        created_by: Option<Uuid>,
    ) -> Result<inventory_item::Model, ServiceError> {
        input.validate()?;
        ensure_non_negative("quantity", input.quantity)?;
        ensure_non_negative("reorder_level", input.reorder_level)?;
        ensure_non_negative("unit_cost", input.unit_cost)?;
        let sku = input.sku.trim().to_uppercase();

        let txn = self.db.begin().await?;
        Self::ensure_sku_free(&txn, &sku, None).await?;

        let now = Utc::now();
        let opening = round_dp(input.quantity, 3);
        let item = inventory_item::ActiveModel {
            sku: Set(sku),
            name: Set(input.name.trim().to_string()),
            category: Set(input.category),
            unit_of_measure: Set(input.unit_of_measure),
            quantity: Set(opening),
            reorder_level: Set(input.reorder_level),
            unit_cost: Set(input.unit_cost),
            location: Set(input.location),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if opening > Decimal::ZERO {
            inventory_transaction::ActiveModel {
                item_id: Set(item.id),
                kind: Set(TransactionKind::Opening),
                quantity_change: Set(opening),
                balance_after: Set(opening),
                reason: Set("opening balance".to_string()),
                reference: Set(None),
                created_by: Set(created_by),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(id = item.id, quantity = %item.quantity, "Inventory item created");
        Ok(item)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: UpdateInventoryItem,
    ) -> Result<inventory_item::Model, ServiceError> {
        input.validate()?;
        if let Some(level) = input.reorder_level {
            ensure_non_negative("reorder_level", level)?;
        }
        if let Some(cost) = input.unit_cost {
            ensure_non_negative("unit_cost", cost)?;
        }
        let current = self.get(id).await?;
        let mut active: inventory_item::ActiveModel = current.into();

        if let Some(sku) = input.sku {
            let sku = sku.trim().to_uppercase();
            Self::ensure_sku_free(&*self.db, &sku, Some(id)).await?;
            active.sku = Set(sku);
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(uom) = input.unit_of_measure {
            active.unit_of_measure = Set(uom);
        }
        if let Some(level) = input.reorder_level {
            active.reorder_level = Set(level);
        }
        if let Some(cost) = input.unit_cost {
            active.unit_cost = Set(cost);
        }
        if let Some(location) = input.location {
            active.location = Set(Some(location));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Move stock and write the ledger row in one transaction
    #[instrument(skip(self, input), fields(kind = ?input.kind, quantity = %input.quantity))]
    pub async fn adjust(
        &self,
        id: i32,
        input: StockAdjustment,
        created_by: Option<Uuid>,
    ) -> Result<AdjustmentResult, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;

        // Row lock holds concurrent adjustments until this one commits
        let item = InventoryItemEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory item", id))?;

        let (balance, change) = apply_adjustment(item.quantity, input.kind, input.quantity)?;
        let now = Utc::now();

        let mut active: inventory_item::ActiveModel = item.into();
        active.quantity = Set(balance);
        active.updated_at = Set(now);
        let item = active.update(&txn).await?;

        let transaction = inventory_transaction::ActiveModel {
            item_id: Set(item.id),
            kind: Set(input.kind.into()),
            quantity_change: Set(change),
            balance_after: Set(balance),
            reason: Set(input.reason.trim().to_string()),
            reference: Set(input.reference),
            created_by: Set(created_by),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(item_id = item.id, %change, %balance, "Stock adjusted");
        self.event_sender.emit(Event::InventoryAdjusted {
            item_id: item.id,
            sku: item.sku.clone(),
            kind: transaction.kind.to_string(),
            quantity_change: change,
            balance_after: balance,
        });
        if item.is_low_stock() {
            self.event_sender.emit(Event::LowStock {
                item_id: item.id,
                sku: item.sku.clone(),
                quantity: item.quantity,
                reorder_level: item.reorder_level,
            });
        }

        Ok(AdjustmentResult { item, transaction })
    }

    /// Ledger rows for an item, newest first
    pub async fn transactions(
        &self,
        item_id: i32,
        page: PageRequest,
    ) -> Result<Paged<inventory_transaction::Model>, ServiceError> {
        self.get(item_id).await?;
        let db = &*self.db;
        let query =
            TransactionEntity::find().filter(inventory_transaction::Column::ItemId.eq(item_id));
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .order_by_desc(inventory_transaction::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let item = self.get(id).await?;
        let lines = BomLineEntity::find()
            .filter(bom_line::Column::InventoryItemId.eq(id))
            .count(&*self.db)
            .await?;
        if lines > 0 {
            return Err(ServiceError::Conflict(format!(
                "item {} is used by {} BOM line(s)",
                item.sku, lines
            )));
        }

        let txn = self.db.begin().await?;
        TransactionEntity::delete_many()
            .filter(inventory_transaction::Column::ItemId.eq(id))
            .exec(&txn)
            .await?;
        InventoryItemEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(id, "Inventory item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AdjustmentKind::Receive, dec!(10), dec!(4.5), dec!(14.5), dec!(4.5))]
    #[case(AdjustmentKind::Issue, dec!(10), dec!(4.5), dec!(5.5), dec!(-4.5))]
    #[case(AdjustmentKind::Issue, dec!(10), dec!(10), dec!(0), dec!(-10))]
    #[case(AdjustmentKind::Issue, dec!(0.3), dec!(0.1), dec!(0.2), dec!(-0.1))]
    #[case(AdjustmentKind::Set, dec!(10), dec!(3), dec!(3), dec!(-7))]
    #[case(AdjustmentKind::Set, dec!(0), dec!(25), dec!(25), dec!(25))]
    fn adjustments(
        #[case] kind: AdjustmentKind,
        #[case] current: Decimal,
        #[case] quantity: Decimal,
        #[case] balance: Decimal,
        #[case] change: Decimal,
    ) {
        assert_eq!(apply_adjustment(current, kind, quantity).unwrap(), (balance, change));
    }

    #[test]
    fn issue_beyond_stock_is_rejected() {
        assert_matches!(
            apply_adjustment(dec!(2), AdjustmentKind::Issue, dec!(2.5)),
            Err(ServiceError::InsufficientStock(_))
        );
    }

    #[test]
    fn negative_and_oversized_quantities_are_rejected() {
        assert_matches!(
            apply_adjustment(dec!(2), AdjustmentKind::Receive, dec!(-1)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            apply_adjustment(dec!(999999999999), AdjustmentKind::Receive, dec!(1)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn adjustment_kind_maps_to_ledger_kind() {
        assert_eq!(TransactionKind::from(AdjustmentKind::Issue), TransactionKind::Issue);
        let parsed: AdjustmentKind = serde_json::from_str("\"receive\"").unwrap();
        assert_eq!(parsed, AdjustmentKind::Receive);
    }
}
