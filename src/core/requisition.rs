//! Requisition lifecycle - submission, review and receipt acknowledgement.
//!
//! Submitting a requisition spends the token of its class in the same
//! transaction that stores it. Review changes are expressed as typed commands
//! so each mutable field is named explicitly.

use crate::{
    core::{stock::StockRef, user::consume_token},
    entities::{
        LineItem, ReceiptAcknowledgement, Requisition, RequisitionKind, RequisitionState,
        ResourceKind, TokenClass, TokenKind, line_item, receipt_acknowledgement, requisition,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{error, info, instrument};

/// One requested stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedItem {
    pub item: StockRef,
    pub quantity: i32,
}

/// A requisition as submitted by its owner.
#[derive(Debug, Clone)]
pub struct NewRequisition {
    pub user_id: i64,
    pub kind: RequisitionKind,
    /// `None` is treated as supplies
    pub resource_kind: Option<ResourceKind>,
    pub items: Vec<RequestedItem>,
}

/// Token class a requisition of this kind spends, if any.
///
/// Ordinary requisitions spend the ordinary token of their resource kind,
/// extraordinary stationery requisitions spend the extraordinary stationery
/// token. Meeting requisitions and extraordinary supply requisitions are not
/// gated by a token.
#[must_use]
pub const fn token_class_for(
    kind: RequisitionKind,
    resource_kind: Option<ResourceKind>,
) -> Option<TokenClass> {
    match kind {
        RequisitionKind::Ordinaria => TokenClass::classify(resource_kind, Some(TokenKind::Ordinario)),
        RequisitionKind::Extraordinaria => {
            TokenClass::classify(resource_kind, Some(TokenKind::Extraordinario))
        }
        RequisitionKind::Juntas => None,
    }
}

fn validate_new_requisition(new: &NewRequisition) -> Result<()> {
    if new.items.is_empty() {
        return Err(Error::Validation {
            message: "A requisition needs at least one line item".to_string(),
        });
    }

    for requested in &new.items {
        if requested.quantity <= 0 {
            return Err(Error::Validation {
                message: format!(
                    "Requested quantity for {} must be positive, got {}",
                    requested.item, requested.quantity
                ),
            });
        }
        if let Some(resource_kind) = new.resource_kind
            && requested.item.resource_kind() != resource_kind
        {
            return Err(Error::Validation {
                message: format!(
                    "{} does not belong to a {resource_kind} requisition",
                    requested.item
                ),
            });
        }
    }

    Ok(())
}

/// Submits a requisition stamped with the current time.
pub async fn submit_requisition(
    db: &DatabaseConnection,
    new: NewRequisition,
) -> Result<requisition::Model> {
    submit_requisition_at(db, new, Utc::now()).await
}

/// Submits a requisition stamped with `submitted_at`.
///
/// Validates the line items, spends the token of the requisition's class (if
/// any) and stores the requisition in state `pendiente` with its line items,
/// all in one transaction.
#[instrument(skip(db, new), fields(user_id = new.user_id, kind = ?new.kind))]
pub async fn submit_requisition_at(
    db: &DatabaseConnection,
    new: NewRequisition,
    submitted_at: DateTime<Utc>,
) -> Result<requisition::Model> {
    validate_new_requisition(&new)?;

    let class = token_class_for(new.kind, new.resource_kind);
    let item_count = i32::try_from(new.items.len()).map_err(|_| Error::Validation {
        message: "Too many line items".to_string(),
    })?;

    let txn = db.begin().await?;

    let stored = async {
        if let Some(class) = class {
            consume_token(&txn, new.user_id, class).await?;
        }

        let requisition = requisition::ActiveModel {
            user_id: Set(new.user_id),
            kind: Set(new.kind),
            resource_kind: Set(new.resource_kind),
            state: Set(RequisitionState::Pendiente),
            token_used: Set(class.is_some()),
            token_kind_used: Set(class.map(TokenClass::token_kind)),
            submitted_at: Set(submitted_at),
            item_count: Set(item_count),
            assigned_admin_id: Set(None),
            admin_notes: Set(None),
            updated_at: Set(submitted_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for requested in &new.items {
            let (supply_item_id, stationery_item_id) = requested.item.columns();
            line_item::ActiveModel {
                requisition_id: Set(requisition.id),
                supply_item_id: Set(supply_item_id),
                stationery_item_id: Set(stationery_item_id),
                requested_quantity: Set(requested.quantity),
                approved_quantity: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        Ok::<_, Error>(requisition)
    }
    .await;

    match stored {
        Ok(requisition) => {
            txn.commit().await?;
            info!(requisition_id = requisition.id, ?class, "Requisition submitted");
            Ok(requisition)
        }
        Err(e) => {
            error!(user_id = new.user_id, error = %e, "Requisition submission rolled back");
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

pub async fn get_requisition_by_id<C>(db: &C, requisition_id: i64) -> Result<Option<requisition::Model>>
where
    C: ConnectionTrait,
{
    Requisition::find_by_id(requisition_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Line items of a requisition, in insertion order.
pub async fn get_line_items<C>(db: &C, requisition_id: i64) -> Result<Vec<line_item::Model>>
where
    C: ConnectionTrait,
{
    LineItem::find()
        .filter(line_item::Column::RequisitionId.eq(requisition_id))
        .order_by_asc(line_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Review changes an admin applies to a requisition.
#[derive(Debug, Clone, Default)]
pub struct RequisitionReview {
    /// New state, if it changes
    pub state: Option<RequisitionState>,
    /// Replacement review notes, if they change
    pub notes: Option<String>,
}

/// Applies a review to a requisition and assigns it to the reviewing admin.
/// Closed and cancelled requisitions cannot be reviewed again.
#[instrument(skip(db, review))]
pub async fn review_requisition(
    db: &DatabaseConnection,
    requisition_id: i64,
    admin_id: i64,
    review: RequisitionReview,
) -> Result<requisition::Model> {
    let requisition = get_requisition_by_id(db, requisition_id)
        .await?
        .ok_or(Error::RequisitionNotFound { id: requisition_id })?;

    if requisition.state.is_terminal() {
        return Err(Error::InvalidState {
            id: requisition_id,
            state: requisition.state,
            action: "reviewed",
        });
    }

    let mut active_model: requisition::ActiveModel = requisition.into();
    active_model.assigned_admin_id = Set(Some(admin_id));
    if let Some(state) = review.state {
        active_model.state = Set(state);
    }
    if let Some(notes) = review.notes {
        active_model.admin_notes = Set(Some(notes));
    }
    active_model.updated_at = Set(Utc::now());

    let updated = active_model.update(db).await?;
    info!(requisition_id, state = %updated.state, "Requisition reviewed");
    Ok(updated)
}

/// Quantity an admin approves for one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemApproval {
    pub line_item_id: i64,
    pub approved_quantity: i32,
}

/// Records the approved quantity of a line item. Zero is a valid decision and
/// means nothing will be delivered for that line.
pub async fn approve_line_item(
    db: &DatabaseConnection,
    approval: LineItemApproval,
) -> Result<line_item::Model> {
    if approval.approved_quantity < 0 {
        return Err(Error::Validation {
            message: format!(
                "Approved quantity cannot be negative, got {}",
                approval.approved_quantity
            ),
        });
    }

    let item = LineItem::find_by_id(approval.line_item_id)
        .one(db)
        .await?
        .ok_or(Error::LineItemNotFound {
            id: approval.line_item_id,
        })?;

    let requisition = get_requisition_by_id(db, item.requisition_id)
        .await?
        .ok_or(Error::RequisitionNotFound {
            id: item.requisition_id,
        })?;
    if requisition.state.is_terminal() {
        return Err(Error::InvalidState {
            id: requisition.id,
            state: requisition.state,
            action: "approved",
        });
    }

    let mut active_model: line_item::ActiveModel = item.into();
    active_model.approved_quantity = Set(Some(approval.approved_quantity));
    active_model.update(db).await.map_err(Into::into)
}

/// Records that `user_id` physically received a closed requisition they own.
#[instrument(skip(db))]
pub async fn acknowledge_receipt(
    db: &DatabaseConnection,
    requisition_id: i64,
    user_id: i64,
) -> Result<receipt_acknowledgement::Model> {
    let requisition = get_requisition_by_id(db, requisition_id)
        .await?
        .ok_or(Error::RequisitionNotFound { id: requisition_id })?;

    // Someone else's requisition is reported as missing
    if requisition.user_id != user_id {
        return Err(Error::RequisitionNotFound { id: requisition_id });
    }
    if requisition.state != RequisitionState::Cerrado {
        return Err(Error::InvalidState {
            id: requisition_id,
            state: requisition.state,
            action: "acknowledged",
        });
    }

    let existing = ReceiptAcknowledgement::find()
        .filter(receipt_acknowledgement::Column::RequisitionId.eq(requisition_id))
        .filter(receipt_acknowledgement::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::AlreadyAcknowledged {
            requisition_id,
            user_id,
        });
    }

    let acknowledgement = receipt_acknowledgement::ActiveModel {
        requisition_id: Set(requisition_id),
        user_id: Set(user_id),
        acknowledged_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(requisition_id, user_id, "Receipt acknowledged");
    Ok(acknowledgement)
}
