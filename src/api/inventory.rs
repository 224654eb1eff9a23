//! Inventory entry points: deduction, receipt acknowledgement and restock.

use super::{CurrentUser, Reply, authorize};
use crate::{
    core::{
        deduction::{StockChange, deduct_for_closed_requisition},
        requisition,
        stock::{self, StockRef},
    },
    entities::{ResourceKind, Role},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

/// Body of a deduction request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeductInventoryRequest {
    pub solicitud_id: Option<i64>,
}

/// One stock change as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementReply {
    pub tabla: &'static str,
    pub item_id: i64,
    pub stock_anterior: i32,
    pub stock_nuevo: i32,
    /// Units moved, always positive
    pub cantidad: i32,
}

impl From<&StockChange> for MovementReply {
    fn from(change: &StockChange) -> Self {
        Self {
            tabla: change.item.table(),
            item_id: change.item.id(),
            stock_anterior: change.stock_before,
            stock_nuevo: change.stock_after,
            cantidad: change.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeductInventoryReply {
    pub message: String,
    pub movimientos: Vec<MovementReply>,
}

fn required_id(value: Option<i64>) -> Result<i64> {
    value.ok_or_else(|| Error::Validation {
        message: "solicitud_id is required".to_string(),
    })
}

/// Deducts the approved quantities of a closed requisition. Admins only.
pub async fn deduct_inventory(
    db: &DatabaseConnection,
    user: Option<&CurrentUser>,
    request: DeductInventoryRequest,
) -> Reply<DeductInventoryReply> {
    async {
        let admin = authorize(user, Role::is_admin, "deduct inventory")?;
        let requisition_id = required_id(request.solicitud_id)?;

        let result = deduct_for_closed_requisition(db, requisition_id, admin.id).await?;
        Ok::<_, Error>(DeductInventoryReply {
            message: format!("Inventario descontado para la solicitud #{requisition_id}"),
            movimientos: result.movements.iter().map(MovementReply::from).collect(),
        })
    }
    .await
    .into()
}

/// Body of a receipt acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcknowledgeReceiptRequest {
    pub solicitud_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcknowledgeReceiptReply {
    pub message: String,
    pub solicitud_id: i64,
}

/// Records that the caller received one of their closed requisitions.
pub async fn acknowledge_receipt(
    db: &DatabaseConnection,
    user: Option<&CurrentUser>,
    request: AcknowledgeReceiptRequest,
) -> Reply<AcknowledgeReceiptReply> {
    async {
        let owner = authorize(user, |_| true, "acknowledge receipt")?;
        let requisition_id = required_id(request.solicitud_id)?;

        requisition::acknowledge_receipt(db, requisition_id, owner.id).await?;
        Ok::<_, Error>(AcknowledgeReceiptReply {
            message: format!("Recepcion registrada para la solicitud #{requisition_id}"),
            solicitud_id: requisition_id,
        })
    }
    .await
    .into()
}

/// Body of a restock request.
#[derive(Debug, Clone, Deserialize)]
pub struct RestockRequest {
    pub tabla: ResourceKind,
    pub item_id: i64,
    pub cantidad: i32,
    #[serde(default)]
    pub motivo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockReply {
    pub message: String,
    pub movimiento: MovementReply,
}

/// Adds received units to a stock item. Admins only.
pub async fn restock(
    db: &DatabaseConnection,
    user: Option<&CurrentUser>,
    request: RestockRequest,
) -> Reply<RestockReply> {
    async {
        let admin = authorize(user, Role::is_admin, "restock")?;
        let item = StockRef::new(request.tabla, request.item_id);
        let reason = request
            .motivo
            .unwrap_or_else(|| "Entrada de inventario".to_string());

        let movement = stock::restock(db, item, request.cantidad, admin.id, reason).await?;
        Ok::<_, Error>(RestockReply {
            message: format!("Entrada registrada en {item}"),
            movimiento: MovementReply {
                tabla: item.table(),
                item_id: item.id(),
                stock_anterior: movement.stock_before,
                stock_nuevo: movement.stock_after,
                cantidad: movement.quantity,
            },
        })
    }
    .await
    .into()
}
