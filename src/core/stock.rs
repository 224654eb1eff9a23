//! Stock item access across the two stock tables.
//!
//! Supplies and stationery live in structurally identical tables. Everything
//! that reads or writes stock goes through [`StockRef`], so the choice of table
//! is made in exactly one place.

use crate::{
    entities::{
        InventoryMovement, MovementKind, ResourceKind, StationeryItem, SupplyItem,
        inventory_movement, stationery_item, supply_item,
    },
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Reference to exactly one stock item in one of the two stock tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StockRef {
    /// Row of `insumos`
    Supply(i64),
    /// Row of `papeleria`
    Stationery(i64),
}

impl StockRef {
    /// Builds a reference for the table that backs `resource_kind`.
    #[must_use]
    pub const fn new(resource_kind: ResourceKind, id: i64) -> Self {
        match resource_kind {
            ResourceKind::Insumo => Self::Supply(id),
            ResourceKind::Papeleria => Self::Stationery(id),
        }
    }

    /// Reads the pair of nullable foreign key columns used by line items and
    /// movements. `row_id` identifies the offending row when both or neither
    /// column is set.
    pub fn from_columns(
        row_id: i64,
        supply_item_id: Option<i64>,
        stationery_item_id: Option<i64>,
    ) -> Result<Self> {
        match (supply_item_id, stationery_item_id) {
            (Some(id), None) => Ok(Self::Supply(id)),
            (None, Some(id)) => Ok(Self::Stationery(id)),
            _ => Err(Error::InvalidLineItem { id: row_id }),
        }
    }

    /// The `(supply_item_id, stationery_item_id)` column pair for this reference.
    #[must_use]
    pub const fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Supply(id) => (Some(id), None),
            Self::Stationery(id) => (None, Some(id)),
        }
    }

    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Supply(id) | Self::Stationery(id) => id,
        }
    }

    #[must_use]
    pub const fn resource_kind(self) -> ResourceKind {
        match self {
            Self::Supply(_) => ResourceKind::Insumo,
            Self::Stationery(_) => ResourceKind::Papeleria,
        }
    }

    /// Name of the backing table.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Supply(_) => "insumos",
            Self::Stationery(_) => "papeleria",
        }
    }
}

impl fmt::Display for StockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.table(), self.id())
    }
}

/// Current stock of an item together with its warning threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub stock: i32,
    pub warning_threshold: i32,
}

/// Reads the current stock of `item`, or `None` if the row does not exist.
pub async fn read_stock<C>(db: &C, item: StockRef) -> Result<Option<StockLevel>>
where
    C: ConnectionTrait,
{
    let level = match item {
        StockRef::Supply(id) => SupplyItem::find_by_id(id)
            .one(db)
            .await?
            .map(|m| StockLevel {
                stock: m.stock,
                warning_threshold: m.warning_threshold,
            }),
        StockRef::Stationery(id) => StationeryItem::find_by_id(id)
            .one(db)
            .await?
            .map(|m| StockLevel {
                stock: m.stock,
                warning_threshold: m.warning_threshold,
            }),
    };
    Ok(level)
}

/// Writes `new_stock` only if the stored value is still `expected`.
///
/// Issues `UPDATE ... SET stock = new WHERE id = ? AND stock = expected`, so a
/// concurrent writer that got there first turns into [`Error::StockConflict`]
/// instead of a lost update.
pub async fn write_stock<C>(db: &C, item: StockRef, expected: i32, new_stock: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = match item {
        StockRef::Supply(id) => {
            SupplyItem::update_many()
                .col_expr(supply_item::Column::Stock, Expr::value(new_stock))
                .filter(supply_item::Column::Id.eq(id))
                .filter(supply_item::Column::Stock.eq(expected))
                .exec(db)
                .await?
        }
        StockRef::Stationery(id) => {
            StationeryItem::update_many()
                .col_expr(stationery_item::Column::Stock, Expr::value(new_stock))
                .filter(stationery_item::Column::Id.eq(id))
                .filter(stationery_item::Column::Stock.eq(expected))
                .exec(db)
                .await?
        }
    };

    if result.rows_affected == 0 {
        return Err(Error::StockConflict { item });
    }
    Ok(())
}

/// A movement about to be appended to `inventario_movimientos`.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub item: StockRef,
    pub kind: MovementKind,
    /// Signed delta applied to the item
    pub quantity: i32,
    pub stock_before: i32,
    pub reason: String,
    pub requisition_id: Option<i64>,
    pub admin_id: i64,
}

/// Appends a movement row. `stock_after` is derived from the snapshot and the
/// delta so the two can never disagree.
pub async fn record_movement<C>(db: &C, movement: NewMovement) -> Result<inventory_movement::Model>
where
    C: ConnectionTrait,
{
    let (supply_item_id, stationery_item_id) = movement.item.columns();
    let row = inventory_movement::ActiveModel {
        supply_item_id: Set(supply_item_id),
        stationery_item_id: Set(stationery_item_id),
        kind: Set(movement.kind),
        quantity: Set(movement.quantity),
        stock_before: Set(movement.stock_before),
        stock_after: Set(movement.stock_before + movement.quantity),
        reason: Set(movement.reason),
        requisition_id: Set(movement.requisition_id),
        admin_id: Set(movement.admin_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    row.insert(db).await.map_err(Into::into)
}

/// Logs the stock level after a change if it needs attention.
pub(crate) fn report_level(item: StockRef, stock_after: i32, warning_threshold: i32) {
    if stock_after < 0 {
        warn!(%item, stock_after, "Stock went negative");
    } else if stock_after <= warning_threshold {
        warn!(%item, stock_after, warning_threshold, "Stock at or below warning threshold");
    }
}

/// Creates a stock item in the table that backs `resource_kind`.
pub async fn create_stock_item<C>(
    db: &C,
    resource_kind: ResourceKind,
    name: &str,
    category: &str,
    stock: i32,
    warning_threshold: i32,
) -> Result<StockRef>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Stock item name cannot be empty".to_string(),
        });
    }

    let id = match resource_kind {
        ResourceKind::Insumo => {
            supply_item::ActiveModel {
                name: Set(name.trim().to_string()),
                category: Set(category.to_string()),
                stock: Set(stock),
                warning_threshold: Set(warning_threshold),
                is_active: Set(true),
                ..Default::default()
            }
            .insert(db)
            .await?
            .id
        }
        ResourceKind::Papeleria => {
            stationery_item::ActiveModel {
                name: Set(name.trim().to_string()),
                category: Set(category.to_string()),
                stock: Set(stock),
                warning_threshold: Set(warning_threshold),
                is_active: Set(true),
                ..Default::default()
            }
            .insert(db)
            .await?
            .id
        }
    };

    Ok(StockRef::new(resource_kind, id))
}

/// Whether an item with this name already exists in the table for `resource_kind`.
/// Names are compared the way [`create_stock_item`] stores them, trimmed.
pub async fn stock_item_name_exists<C>(
    db: &C,
    resource_kind: ResourceKind,
    name: &str,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    let found = match resource_kind {
        ResourceKind::Insumo => SupplyItem::find()
            .filter(supply_item::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some(),
        ResourceKind::Papeleria => StationeryItem::find()
            .filter(stationery_item::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some(),
    };
    Ok(found)
}

/// Receives `quantity` units of `item` into stock and records an `entrada` movement.
#[instrument(skip(db, reason))]
pub async fn restock(
    db: &DatabaseConnection,
    item: StockRef,
    quantity: i32,
    admin_id: i64,
    reason: String,
) -> Result<inventory_movement::Model> {
    if quantity <= 0 {
        return Err(Error::Validation {
            message: format!("Restock quantity must be positive, got {quantity}"),
        });
    }

    let txn = db.begin().await?;

    let applied = async {
        let level = read_stock(&txn, item)
            .await?
            .ok_or(Error::StockItemNotFound { item })?;
        let stock_after = level.stock + quantity;
        write_stock(&txn, item, level.stock, stock_after).await?;

        record_movement(
            &txn,
            NewMovement {
                item,
                kind: MovementKind::Entrada,
                quantity,
                stock_before: level.stock,
                reason,
                requisition_id: None,
                admin_id,
            },
        )
        .await
    }
    .await;

    match applied {
        Ok(movement) => {
            txn.commit().await?;
            info!(%item, quantity, stock_after = movement.stock_after, "Stock received");
            Ok(movement)
        }
        Err(e) => {
            error!(%item, admin_id, error = %e, "Restock failed, rolling back");
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Lists the movements recorded for one item, oldest first.
pub async fn get_movements_for_item<C>(db: &C, item: StockRef) -> Result<Vec<inventory_movement::Model>>
where
    C: ConnectionTrait,
{
    use sea_orm::QueryOrder;

    let query = match item {
        StockRef::Supply(id) => {
            InventoryMovement::find().filter(inventory_movement::Column::SupplyItemId.eq(id))
        }
        StockRef::Stationery(id) => InventoryMovement::find()
            .filter(inventory_movement::Column::StationeryItemId.eq(id)),
    };

    query
        .order_by_asc(inventory_movement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
