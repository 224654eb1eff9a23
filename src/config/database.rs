//! Database configuration for the ledger.
//!
//! Handles the `SQLite` connection and table creation. Tables are generated from
//! the entity definitions with `Schema::create_table_from_entity`; the two
//! composite unique keys that entities cannot express are added as indexes.

use crate::entities::{
    InventoryMovement, LineItem, ReceiptAcknowledgement, Requisition, StationeryItem,
    SupplyItem, TokenRenewal, User, receipt_acknowledgement, token_renewal,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/supply_ledger.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling
/// back to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url())
        .await
        .map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table and unique index if they do not exist yet.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, SupplyItem).await?;
    create_table(db, &schema, StationeryItem).await?;
    create_table(db, &schema, Requisition).await?;
    create_table(db, &schema, LineItem).await?;
    create_table(db, &schema, InventoryMovement).await?;
    create_table(db, &schema, ReceiptAcknowledgement).await?;
    create_table(db, &schema, TokenRenewal).await?;

    // One acknowledgement per (requisition, user)
    let acknowledgement_index = Index::create()
        .name("idx_solicitudes_recibidos_unique")
        .table(ReceiptAcknowledgement)
        .col(receipt_acknowledgement::Column::RequisitionId)
        .col(receipt_acknowledgement::Column::UserId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&acknowledgement_index)).await?;

    // One renewal record per (user, period, resource kind, token kind)
    let renewal_index = Index::create()
        .name("idx_tokens_renovacion_unique")
        .table(TokenRenewal)
        .col(token_renewal::Column::UserId)
        .col(token_renewal::Column::Period)
        .col(token_renewal::Column::ResourceKind)
        .col(token_renewal::Column::TokenKind)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&renewal_index)).await?;

    Ok(())
}
