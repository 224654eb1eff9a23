//! Requisition entity - A user's request for one or more stock items.
//!
//! Created in state `pendiente`, moved through review by an admin and closed
//! or cancelled. `token_kind_used` is `None` whenever `token_used` is false.

use super::kinds::{RequisitionKind, RequisitionState, ResourceKind, TokenKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Requisition database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "solicitudes")]
pub struct Model {
    /// Unique identifier for the requisition
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the requisition
    pub user_id: i64,
    /// Urgency class
    pub kind: RequisitionKind,
    /// Stock table the items come from; `None` means supplies
    pub resource_kind: Option<ResourceKind>,
    /// Review state
    pub state: RequisitionState,
    /// Whether submitting this requisition consumed a token
    pub token_used: bool,
    /// Which token was consumed, if any
    pub token_kind_used: Option<TokenKind>,
    /// When the requisition was submitted
    pub submitted_at: DateTimeUtc,
    /// Number of line items
    pub item_count: i32,
    /// Admin currently reviewing the requisition
    pub assigned_admin_id: Option<i64>,
    /// Free-form review notes
    pub admin_notes: Option<String>,
    /// Last review change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Requisition and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each requisition belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One requisition has many line items
    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
