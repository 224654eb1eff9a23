//! Inventory movement entity - Append-only audit of every stock change.
//!
//! `stock_after = stock_before + quantity` holds for every row, and
//! `stock_after` is the item's stock at the moment the row was written.

use super::kinds::MovementKind;
use crate::core::stock::StockRef;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory movement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventario_movimientos")]
pub struct Model {
    /// Unique identifier for the movement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Moved supply item, if any
    pub supply_item_id: Option<i64>,
    /// Moved stationery item, if any
    pub stationery_item_id: Option<i64>,
    /// Delivery or stock entry
    pub kind: MovementKind,
    /// Signed quantity delta
    pub quantity: i32,
    /// Item stock before the movement
    pub stock_before: i32,
    /// Item stock after the movement
    pub stock_after: i32,
    /// Human readable reason
    pub reason: String,
    /// Requisition that caused the movement, if any
    pub requisition_id: Option<i64>,
    /// Admin who performed the movement
    pub admin_id: i64,
    /// When the movement was recorded
    pub created_at: DateTimeUtc,
}

impl Model {
    /// The stock item this movement touched.
    pub fn stock_ref(&self) -> crate::errors::Result<StockRef> {
        StockRef::from_columns(self.id, self.supply_item_id, self.stationery_item_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
