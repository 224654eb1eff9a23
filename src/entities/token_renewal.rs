//! Token renewal entity - Audit verdict of one monthly renewal evaluation.
//!
//! Keyed uniquely by (user, period, resource kind, token kind). Re-running the
//! renewal for the same key overwrites the row instead of appending a new one.

use super::kinds::{ResourceKind, TokenKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Token renewal audit model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tokens_renovacion")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Evaluated user
    pub user_id: i64,
    /// Period label, `YYYY-MM`
    pub period: String,
    pub resource_kind: ResourceKind,
    pub token_kind: TokenKind,
    /// The user had at least one qualifying requisition in the window
    #[sea_orm(column_name = "tenia_solicitud")]
    pub had_requisition: bool,
    /// Every qualifying requisition was acknowledged
    #[sea_orm(column_name = "marco_recibido")]
    pub acknowledged: bool,
    /// Verdict: the token was restored
    #[sea_orm(column_name = "token_renovado")]
    pub renewed: bool,
    /// When this verdict was last written
    pub evaluated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
