//! Stock deduction for a closed requisition.
//!
//! Every approved line item is subtracted from its stock table and recorded as
//! an `entrega` movement. The whole batch runs in one transaction: either all
//! line items are applied together with their movements, or nothing is.

use crate::{
    core::{
        requisition::{get_line_items, get_requisition_by_id},
        stock::{NewMovement, StockRef, read_stock, record_movement, report_level, write_stock},
    },
    entities::{MovementKind, RequisitionState},
    errors::{Error, Result},
};
use sea_orm::{TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

/// One applied stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockChange {
    pub item: StockRef,
    pub stock_before: i32,
    pub stock_after: i32,
    /// Approved quantity taken out of stock (positive)
    pub quantity: i32,
    pub movement_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeductionResult {
    pub requisition_id: i64,
    /// Changes in line item order
    pub movements: Vec<StockChange>,
}

/// Deducts the approved quantities of a requisition from inventory.
///
/// Line items without an approved quantity, or with zero approved, are
/// skipped. A missing stock item or a concurrent stock change aborts the whole
/// deduction and leaves stock and movements untouched. Stock is allowed to go
/// negative; that case is logged as a warning.
#[instrument(skip(db))]
pub async fn deduct_for_closed_requisition(
    db: &DatabaseConnection,
    requisition_id: i64,
    admin_id: i64,
) -> Result<DeductionResult> {
    let txn = db.begin().await?;

    match apply_deduction(&txn, requisition_id, admin_id).await {
        Ok(result) => {
            txn.commit().await?;
            info!(
                requisition_id,
                admin_id,
                items = result.movements.len(),
                "Inventory deducted"
            );
            Ok(result)
        }
        Err(e) => {
            error!(requisition_id, error = %e, "Deduction failed, rolling back");
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn apply_deduction<C>(db: &C, requisition_id: i64, admin_id: i64) -> Result<DeductionResult>
where
    C: ConnectionTrait,
{
    let requisition = get_requisition_by_id(db, requisition_id)
        .await?
        .ok_or(Error::RequisitionNotFound { id: requisition_id })?;

    if requisition.state != RequisitionState::Cerrado {
        warn!(
            requisition_id,
            state = %requisition.state,
            "Deducting inventory for a requisition that is not closed"
        );
    }

    let line_items = get_line_items(db, requisition_id).await?;
    let reason = format!("Entrega de solicitud #{requisition_id}");
    let mut movements = Vec::with_capacity(line_items.len());

    for line_item in line_items {
        let approved = match line_item.approved_quantity {
            Some(quantity) if quantity > 0 => quantity,
            _ => {
                debug!(line_item_id = line_item.id, "Nothing approved, skipping");
                continue;
            }
        };

        let item = line_item.stock_ref()?;
        let level = read_stock(db, item)
            .await?
            .ok_or(Error::StockItemNotFound { item })?;
        let stock_after = level.stock - approved;

        write_stock(db, item, level.stock, stock_after).await?;
        report_level(item, stock_after, level.warning_threshold);

        let movement = record_movement(
            db,
            NewMovement {
                item,
                kind: MovementKind::Entrega,
                quantity: -approved,
                stock_before: level.stock,
                reason: reason.clone(),
                requisition_id: Some(requisition_id),
                admin_id,
            },
        )
        .await?;

        movements.push(StockChange {
            item,
            stock_before: level.stock,
            stock_after,
            quantity: approved,
            movement_id: movement.id,
        });
    }

    Ok(DeductionResult {
        requisition_id,
        movements,
    })
}
