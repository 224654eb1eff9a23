//! Shared test utilities for the ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        stock::{StockRef, create_stock_item},
        user::{NewUser, create_user},
    },
    entities::{
        RequisitionKind, RequisitionState, ResourceKind, Role, TokenKind, line_item,
        receipt_acknowledgement, requisition, user,
    },
    errors::Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Midnight UTC on the given day.
///
/// # Panics
/// Panics on an invalid date.
#[allow(clippy::unwrap_used)]
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Creates a regular user with all tokens available.
///
/// # Defaults
/// * `email`: `{name}@example.com`
/// * `role`: user
/// * `department`: "Contabilidad"
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<user::Model> {
    create_user(
        db,
        NewUser {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            role: Role::User,
            department: "Contabilidad".to_string(),
        },
    )
    .await
}

/// Creates an admin account.
pub async fn create_test_admin(db: &DatabaseConnection, name: &str) -> Result<user::Model> {
    create_user(
        db,
        NewUser {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            role: Role::Admin,
            department: "Almacen".to_string(),
        },
    )
    .await
}

/// Creates a super admin account.
pub async fn create_test_super_admin(db: &DatabaseConnection, name: &str) -> Result<user::Model> {
    create_user(
        db,
        NewUser {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            role: Role::SuperAdmin,
            department: "Direccion".to_string(),
        },
    )
    .await
}

pub async fn deactivate_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    user::ActiveModel {
        id: Set(user_id),
        is_active: Set(false),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Creates a supply item with a warning threshold of 2.
pub async fn create_test_supply(db: &DatabaseConnection, name: &str, stock: i32) -> Result<StockRef> {
    create_stock_item(db, ResourceKind::Insumo, name, "general", stock, 2).await
}

/// Creates a stationery item with a warning threshold of 2.
pub async fn create_test_stationery(
    db: &DatabaseConnection,
    name: &str,
    stock: i32,
) -> Result<StockRef> {
    create_stock_item(db, ResourceKind::Papeleria, name, "general", stock, 2).await
}

/// Stores a requisition that spent a token, bypassing submission so tests can
/// pick any state and timestamp.
pub async fn create_token_requisition(
    db: &DatabaseConnection,
    user_id: i64,
    resource_kind: Option<ResourceKind>,
    token_kind: TokenKind,
    state: RequisitionState,
    submitted_at: DateTime<Utc>,
) -> Result<requisition::Model> {
    let kind = match token_kind {
        TokenKind::Ordinario => RequisitionKind::Ordinaria,
        TokenKind::Extraordinario => RequisitionKind::Extraordinaria,
    };

    requisition::ActiveModel {
        user_id: Set(user_id),
        kind: Set(kind),
        resource_kind: Set(resource_kind),
        state: Set(state),
        token_used: Set(true),
        token_kind_used: Set(Some(token_kind)),
        submitted_at: Set(submitted_at),
        item_count: Set(0),
        assigned_admin_id: Set(None),
        admin_notes: Set(None),
        updated_at: Set(submitted_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Stores a closed meeting requisition, which never spends a token.
pub async fn create_meeting_requisition(
    db: &DatabaseConnection,
    user_id: i64,
    submitted_at: DateTime<Utc>,
) -> Result<requisition::Model> {
    requisition::ActiveModel {
        user_id: Set(user_id),
        kind: Set(RequisitionKind::Juntas),
        resource_kind: Set(None),
        state: Set(RequisitionState::Cerrado),
        token_used: Set(false),
        token_kind_used: Set(None),
        submitted_at: Set(submitted_at),
        item_count: Set(0),
        assigned_admin_id: Set(None),
        admin_notes: Set(None),
        updated_at: Set(submitted_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Adds a line item to an existing requisition.
pub async fn add_line_item(
    db: &DatabaseConnection,
    requisition_id: i64,
    item: StockRef,
    requested_quantity: i32,
    approved_quantity: Option<i32>,
) -> Result<line_item::Model> {
    let (supply_item_id, stationery_item_id) = item.columns();
    line_item::ActiveModel {
        requisition_id: Set(requisition_id),
        supply_item_id: Set(supply_item_id),
        stationery_item_id: Set(stationery_item_id),
        requested_quantity: Set(requested_quantity),
        approved_quantity: Set(approved_quantity),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records a receipt acknowledgement directly, without the ownership and
/// state checks of `acknowledge_receipt`.
pub async fn acknowledge(
    db: &DatabaseConnection,
    requisition_id: i64,
    user_id: i64,
) -> Result<receipt_acknowledgement::Model> {
    receipt_acknowledgement::ActiveModel {
        requisition_id: Set(requisition_id),
        user_id: Set(user_id),
        acknowledged_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
