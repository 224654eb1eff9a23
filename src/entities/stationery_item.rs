//! Stationery item entity - A stock item of stationery (paper, pens, folders).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stationery item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papeleria")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item name, unique within the table
    #[sea_orm(unique)]
    pub name: String,
    /// Grouping used by reports
    pub category: String,
    /// Units currently on hand
    pub stock: i32,
    /// Stock level at or below which the item is reported as low
    pub warning_threshold: i32,
    /// Inactive items are hidden from new requisitions
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
