#![allow(clippy::result_large_err)]

//! Operator command line for the supply ledger.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use serde::Serialize;
use std::{path::PathBuf, process::ExitCode};
use supply_ledger::{
    api::{
        CurrentUser, Reply,
        inventory::{self, AcknowledgeReceiptRequest, DeductInventoryRequest, RestockRequest},
        renewal,
    },
    config::{catalog, database},
    core::user::{NewUser, create_user},
    entities::{ResourceKind, Role},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "supply-ledger")]
#[command(about = "Office supply requisitions, inventory and monthly token renewal", long_about = None)]
#[command(version)]
struct Cli {
    /// Stock catalog file used by `init`
    #[arg(short, long, env = "SUPPLY_LEDGER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables and seed the stock catalog
    Init,

    /// Register a user account with all tokens available
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,
        #[arg(long, default_value = "")]
        department: String,
    },

    /// Deduct the approved quantities of a closed requisition
    Deduct {
        #[arg(long)]
        requisition: i64,
        /// Acting admin
        #[arg(long)]
        as_user: i64,
    },

    /// Run the monthly token renewal
    Renew {
        /// Acting super admin
        #[arg(long)]
        as_user: i64,
        /// Evaluate as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Acknowledge receipt of a closed requisition
    Acknowledge {
        #[arg(long)]
        requisition: i64,
        /// Requisition owner
        #[arg(long)]
        as_user: i64,
    },

    /// Receive units into a stock item
    Restock {
        #[arg(long, value_enum)]
        table: TableArg,
        #[arg(long)]
        item: i64,
        #[arg(long)]
        quantity: i32,
        #[arg(long)]
        reason: Option<String>,
        /// Acting admin
        #[arg(long)]
        as_user: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    User,
    Admin,
    SuperAdmin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Self::User,
            RoleArg::Admin => Self::Admin,
            RoleArg::SuperAdmin => Self::SuperAdmin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TableArg {
    Insumos,
    Papeleria,
}

impl From<TableArg> for ResourceKind {
    fn from(arg: TableArg) -> Self {
        match arg {
            TableArg::Insumos => Self::Insumo,
            TableArg::Papeleria => Self::Papeleria,
        }
    }
}

fn print_reply<T: Serialize>(reply: &Reply<T>) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(reply)?);
    Ok(if reply.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Connected to {}", database::get_database_url()))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    match cli.command {
        Commands::Init => {
            let catalog = match cli.config {
                Some(path) => catalog::load_config(path),
                None => catalog::load_default_config(),
            }
            .inspect_err(|e| error!("Failed to load stock catalog: {}", e))?;
            let added = catalog::seed_catalog(&db, &catalog).await?;
            info!(added, "Ledger initialized");
            Ok(ExitCode::SUCCESS)
        }
        Commands::AddUser {
            name,
            email,
            role,
            department,
        } => {
            let user = create_user(
                &db,
                NewUser {
                    name,
                    email,
                    role: role.into(),
                    department,
                },
            )
            .await?;
            info!(user_id = user.id, "User created");
            println!("{}", user.id);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Deduct {
            requisition,
            as_user,
        } => {
            let user = CurrentUser::load(&db, as_user).await?;
            let request = DeductInventoryRequest {
                solicitud_id: Some(requisition),
            };
            print_reply(&inventory::deduct_inventory(&db, user.as_ref(), request).await)
        }
        Commands::Renew { as_user, date } => {
            let user = CurrentUser::load(&db, as_user).await?;
            let today = date.unwrap_or_else(|| Utc::now().date_naive());
            print_reply(&renewal::run_renewal_process(&db, user.as_ref(), today).await)
        }
        Commands::Acknowledge {
            requisition,
            as_user,
        } => {
            let user = CurrentUser::load(&db, as_user).await?;
            let request = AcknowledgeReceiptRequest {
                solicitud_id: Some(requisition),
            };
            print_reply(&inventory::acknowledge_receipt(&db, user.as_ref(), request).await)
        }
        Commands::Restock {
            table,
            item,
            quantity,
            reason,
            as_user,
        } => {
            let user = CurrentUser::load(&db, as_user).await?;
            let request = RestockRequest {
                tabla: table.into(),
                item_id: item,
                cantidad: quantity,
                motivo: reason,
            };
            print_reply(&inventory::restock(&db, user.as_ref(), request).await)
        }
    }
}
