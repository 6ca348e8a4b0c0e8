//! CLI command definitions and dispatch.

pub mod assign;
pub mod grant;
pub mod migrate;
pub mod pool;
pub mod unassign;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;

use seatpool_allocator::Allocator;
use seatpool_core::config::AppConfig;
use seatpool_core::error::AppError;
use seatpool_core::types::{PoolId, ResourceId, TenantId};
use seatpool_database::{DatabasePool, PgAllocationStore};

use crate::output::OutputFormat;

/// SeatPool: seat grants and assignments per tenant and resource
#[derive(Debug, Parser)]
#[command(name = "seatpool", version, about, long_about = None)]
pub struct Cli {
    /// Path to the base configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay, read from config/{env}.toml
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Issue and inspect seat grants
    Grant(grant::GrantArgs),
    /// Assign seats to requesters
    Assign(assign::AssignArgs),
    /// Free seats held by requesters
    Unassign(unassign::UnassignArgs),
    /// Pool capacity and usage
    Pool(pool::PoolArgs),
}

impl Cli {
    /// Run the selected command.
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Grant(args) => grant::execute(args, config, self.format).await,
            Commands::Assign(args) => assign::execute(args, config, self.format).await,
            Commands::Unassign(args) => unassign::execute(args, config).await,
            Commands::Pool(args) => pool::execute(args, config, self.format).await,
        }
    }
}

/// The `--tenant` / `--resource` pair naming a pool.
#[derive(Debug, Clone, Args)]
pub struct PoolSelector {
    /// Tenant ID (UUID)
    #[arg(long)]
    pub tenant: TenantId,
    /// Resource ID (UUID)
    #[arg(long)]
    pub resource: ResourceId,
}

impl PoolSelector {
    pub fn pool(&self) -> PoolId {
        PoolId::new(self.tenant, self.resource)
    }
}

/// Load layered configuration.
pub fn load_config(path: &str, env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(path, env)
}

/// Connect to the configured database.
pub async fn create_db_pool(config: &AppConfig) -> Result<PgPool, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    pool.health_check().await?;
    Ok(pool.pool().clone())
}

/// Allocator over PostgreSQL with the configured lock wait.
pub fn create_allocator(config: &AppConfig, pool: PgPool) -> Allocator {
    let store = PgAllocationStore::new(pool, config.allocator.lock_timeout());
    Allocator::with_tracing(Arc::new(store))
}
