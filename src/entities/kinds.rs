//! Enumerated column values shared by several entities.
//!
//! All of them are stored as their Spanish string value so the tables stay
//! readable from any SQL client.

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular employee
    #[sea_orm(string_value = "user")]
    User,
    /// Reviews requisitions and moves stock
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Highest privilege, the only role allowed to run token renewal
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl Role {
    /// Whether this role may review requisitions and deduct stock.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

/// Urgency class of a requisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum RequisitionKind {
    /// Regular monthly request
    #[sea_orm(string_value = "ordinaria")]
    Ordinaria,
    /// Out-of-cycle request
    #[sea_orm(string_value = "extraordinaria")]
    Extraordinaria,
    /// Meeting supplies, never gated by a token
    #[sea_orm(string_value = "juntas")]
    Juntas,
}

/// Which stock table a requisition draws from. A missing value means supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[sea_orm(string_value = "insumo")]
    Insumo,
    #[sea_orm(string_value = "papeleria")]
    Papeleria,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insumo => "insumo",
            Self::Papeleria => "papeleria",
        }
    }
}

/// Review state of a requisition. `Cerrado` and `Cancelado` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum RequisitionState {
    #[sea_orm(string_value = "pendiente")]
    Pendiente,
    #[sea_orm(string_value = "en_revision")]
    EnRevision,
    #[sea_orm(string_value = "cerrado")]
    Cerrado,
    #[sea_orm(string_value = "cancelado")]
    Cancelado,
}

impl RequisitionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cerrado | Self::Cancelado)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::EnRevision => "en_revision",
            Self::Cerrado => "cerrado",
            Self::Cancelado => "cancelado",
        }
    }
}

/// Which token a requisition consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    #[sea_orm(string_value = "ordinario")]
    Ordinario,
    #[sea_orm(string_value = "extraordinario")]
    Extraordinario,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordinario => "ordinario",
            Self::Extraordinario => "extraordinario",
        }
    }
}

/// Kind of an inventory movement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock handed out for an approved requisition
    #[sea_orm(string_value = "entrega")]
    Entrega,
    /// Stock received into the storeroom
    #[sea_orm(string_value = "entrada")]
    Entrada,
}

/// One of the three independent per-user token balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    /// `supplyToken`: ordinary supply requests (resource kind `insumo` or absent)
    SupplyOrdinary,
    /// `stationeryTokenOrdinary`
    StationeryOrdinary,
    /// `stationeryTokenExtraordinary`
    StationeryExtraordinary,
}

impl TokenClass {
    /// Evaluation order used by the monthly renewal.
    pub const ALL: [Self; 3] = [
        Self::SupplyOrdinary,
        Self::StationeryOrdinary,
        Self::StationeryExtraordinary,
    ];

    /// Resource kind recorded in the renewal audit for this class.
    #[must_use]
    pub const fn resource_kind(self) -> ResourceKind {
        match self {
            Self::SupplyOrdinary => ResourceKind::Insumo,
            Self::StationeryOrdinary | Self::StationeryExtraordinary => ResourceKind::Papeleria,
        }
    }

    /// Token kind recorded in the renewal audit for this class.
    #[must_use]
    pub const fn token_kind(self) -> TokenKind {
        match self {
            Self::SupplyOrdinary | Self::StationeryOrdinary => TokenKind::Ordinario,
            Self::StationeryExtraordinary => TokenKind::Extraordinario,
        }
    }

    /// Maps a requisition's (resource kind, token kind used) pair to the class it
    /// counts against. Pairs outside the three classes count against none.
    #[must_use]
    pub const fn classify(
        resource_kind: Option<ResourceKind>,
        token_kind: Option<TokenKind>,
    ) -> Option<Self> {
        match (resource_kind, token_kind) {
            (Some(ResourceKind::Insumo) | None, Some(TokenKind::Ordinario)) => {
                Some(Self::SupplyOrdinary)
            }
            (Some(ResourceKind::Papeleria), Some(TokenKind::Ordinario)) => {
                Some(Self::StationeryOrdinary)
            }
            (Some(ResourceKind::Papeleria), Some(TokenKind::Extraordinario)) => {
                Some(Self::StationeryExtraordinary)
            }
            _ => None,
        }
    }

    /// Key used for this class in boundary replies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SupplyOrdinary => "insumo",
            Self::StationeryOrdinary => "papeleria_ordinario",
            Self::StationeryExtraordinary => "papeleria_extraordinario",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

display_as_str!(Role, ResourceKind, RequisitionState, TokenKind, TokenClass);
