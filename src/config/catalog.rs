//! Stock catalog loading from config.toml
//!
//! The catalog lists the supply and stationery items a fresh ledger starts
//! with. Seeding only adds items whose name is not in the store yet, so it is
//! safe to run on every start.

use crate::{
    core::stock::{create_stock_item, stock_item_name_exists},
    entities::ResourceKind,
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info, instrument};

/// Default location of the catalog file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// Items seeded into `insumos`
    #[serde(default)]
    pub supplies: Vec<StockItemConfig>,
    /// Items seeded into `papeleria`
    #[serde(default)]
    pub stationery: Vec<StockItemConfig>,
}

/// Configuration for a single stock item
#[derive(Debug, Deserialize, Clone)]
pub struct StockItemConfig {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub stock: i32,
    /// Stock level at or below which a warning is logged
    #[serde(default)]
    pub warning_threshold: i32,
}

/// Loads the catalog from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read config file {}: {e}",
            path.as_ref().display()
        ),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the catalog from `SUPPLY_LEDGER_CONFIG`, or ./config.toml if unset.
pub fn load_default_config() -> Result<CatalogConfig> {
    let path =
        std::env::var("SUPPLY_LEDGER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

/// Inserts every catalog item that does not exist yet. Returns how many were added.
#[instrument(skip_all)]
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<usize> {
    info!(
        supplies = config.supplies.len(),
        stationery = config.stationery.len(),
        "Seeding stock catalog"
    );

    let txn = db.begin().await?;

    let seeded = async {
        let mut added = 0;
        let entries = config
            .supplies
            .iter()
            .map(|item| (ResourceKind::Insumo, item))
            .chain(
                config
                    .stationery
                    .iter()
                    .map(|item| (ResourceKind::Papeleria, item)),
            );

        for (resource_kind, item) in entries {
            if stock_item_name_exists(&txn, resource_kind, &item.name).await? {
                debug!(name = %item.name, %resource_kind, "Already present, skipping");
                continue;
            }
            create_stock_item(
                &txn,
                resource_kind,
                &item.name,
                &item.category,
                item.stock,
                item.warning_threshold,
            )
            .await?;
            added += 1;
        }
        Ok::<_, Error>(added)
    }
    .await;

    match seeded {
        Ok(added) => {
            txn.commit().await?;
            info!(added, "Stock catalog seeded");
            Ok(added)
        }
        Err(e) => {
            error!(error = %e, "Seeding failed, rolling back");
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
