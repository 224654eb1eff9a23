//! Unified error types for the supply ledger.
//!
//! Every fallible operation in the crate returns [`Result`]. The boundary layer
//! in [`crate::api`] turns these into structured replies, so no error value ever
//! leaves the crate through the exposed entry points.

use crate::core::stock::StockRef;
use crate::entities::{RequisitionState, Role, TokenClass};
use thiserror::Error;

/// Coarse classification used by the boundary layer to shape replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed input, rejected before any transaction is opened
    Validation,
    /// A referenced requisition, line item, user or stock item does not exist
    NotFound,
    /// Caller is not authenticated
    Unauthenticated,
    /// Caller lacks the required role
    Forbidden,
    /// The request conflicts with the current state of the store
    Conflict,
    /// Unexpected store or transport failure
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Requisition {id} not found")]
    RequisitionNotFound { id: i64 },

    #[error("Line item {id} not found")]
    LineItemNotFound { id: i64 },

    #[error("Stock item {item} not found")]
    StockItemNotFound { item: StockRef },

    #[error("User {id} not found")]
    UserNotFound { id: i64 },

    #[error("Line item {id} must reference exactly one supply or stationery item")]
    InvalidLineItem { id: i64 },

    #[error("Stock for {item} changed while it was being updated")]
    StockConflict { item: StockRef },

    #[error("User {user_id} has no {class} token available")]
    TokenUnavailable { user_id: i64, class: TokenClass },

    #[error("Requisition {requisition_id} was already acknowledged by user {user_id}")]
    AlreadyAcknowledged { requisition_id: i64, user_id: i64 },

    #[error("Requisition {id} is {state} and cannot be {action}")]
    InvalidState {
        id: i64,
        state: RequisitionState,
        action: &'static str,
    },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classifies the error into the taxonomy the boundary layer reports.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidLineItem { .. } => ErrorKind::Validation,
            Self::RequisitionNotFound { .. }
            | Self::LineItemNotFound { .. }
            | Self::StockItemNotFound { .. }
            | Self::UserNotFound { .. } => ErrorKind::NotFound,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::StockConflict { .. }
            | Self::TokenUnavailable { .. }
            | Self::AlreadyAcknowledged { .. }
            | Self::InvalidState { .. } => ErrorKind::Conflict,
            Self::Config { .. } | Self::Database(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
