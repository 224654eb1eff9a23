//! User entity - An employee account with its three token balances.
//!
//! Each balance is an availability flag (`1` available, `0` consumed), not a
//! counter. Balances are consumed when a requisition is submitted and restored
//! only by the monthly renewal or an admin override.

use super::kinds::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login e-mail, unique across accounts
    #[sea_orm(unique)]
    pub email: String,
    /// Access level
    pub role: Role,
    /// Department the user belongs to
    pub department: String,
    /// Ordinary supply token (0 or 1)
    pub supply_token: i32,
    /// Ordinary stationery token (0 or 1)
    pub stationery_token_ordinary: i32,
    /// Extraordinary stationery token (0 or 1)
    pub stationery_token_extraordinary: i32,
    /// Inactive users are skipped by the monthly renewal
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many requisitions
    #[sea_orm(has_many = "super::requisition::Entity")]
    Requisitions,
}

impl Related<super::requisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
