//! Receipt acknowledgement entity - A user's confirmation that a closed
//! requisition was physically received. Unique per (requisition, user).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "solicitudes_recibidos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub requisition_id: i64,
    pub user_id: i64,
    pub acknowledged_at: DateTimeUtc,
}

/// Defines relationships between ReceiptAcknowledgement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each acknowledgement refers to one requisition
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
