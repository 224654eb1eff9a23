//! Line item entity - One stock item and quantity within a requisition.
//!
//! Exactly one of `supply_item_id` / `stationery_item_id` is set. Rows are only
//! written from a [`StockRef`](crate::core::stock::StockRef) and read back
//! through [`Model::stock_ref`], which rejects rows breaking that rule.

use crate::core::stock::StockRef;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "solicitud_detalles")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requisition this line belongs to
    pub requisition_id: i64,
    /// Referenced supply item, if this line draws from `insumos`
    pub supply_item_id: Option<i64>,
    /// Referenced stationery item, if this line draws from `papeleria`
    pub stationery_item_id: Option<i64>,
    /// Quantity the user asked for
    pub requested_quantity: i32,
    /// Quantity the admin approved; `None` until decided
    pub approved_quantity: Option<i32>,
}

impl Model {
    /// The stock item this line references.
    pub fn stock_ref(&self) -> crate::errors::Result<StockRef> {
        StockRef::from_columns(self.id, self.supply_item_id, self.stationery_item_id)
    }
}

/// Defines relationships between LineItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one requisition
    #[sea_orm(
        belongs_to = "super::requisition::Entity",
        from = "Column::RequisitionId",
        to = "super::requisition::Column::Id"
    )]
    Requisition,
}

impl Related<super::requisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
