//! Entity module - Contains all SeaORM entity definitions for the ledger.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod inventory_movement;
pub mod kinds;
pub mod line_item;
pub mod receipt_acknowledgement;
pub mod requisition;
pub mod stationery_item;
pub mod supply_item;
pub mod token_renewal;
pub mod user;

pub use kinds::{
    MovementKind, RequisitionKind, RequisitionState, ResourceKind, Role, TokenClass, TokenKind,
};

// Re-export specific types to avoid conflicts
pub use inventory_movement::{
    Column as InventoryMovementColumn, Entity as InventoryMovement,
    Model as InventoryMovementModel,
};
pub use line_item::{Column as LineItemColumn, Entity as LineItem, Model as LineItemModel};
pub use receipt_acknowledgement::{
    Column as ReceiptAcknowledgementColumn, Entity as ReceiptAcknowledgement,
    Model as ReceiptAcknowledgementModel,
};
pub use requisition::{
    Column as RequisitionColumn, Entity as Requisition, Model as RequisitionModel,
};
pub use stationery_item::{
    Column as StationeryItemColumn, Entity as StationeryItem, Model as StationeryItemModel,
};
pub use supply_item::{Column as SupplyItemColumn, Entity as SupplyItem, Model as SupplyItemModel};
pub use token_renewal::{
    Column as TokenRenewalColumn, Entity as TokenRenewal, Model as TokenRenewalModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
