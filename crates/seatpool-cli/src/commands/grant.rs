//! Grant management commands.

use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use seatpool_core::config::AppConfig;
use seatpool_core::error::AppError;
use seatpool_database::GrantRepository;
use seatpool_entity::grant::Grant;

use super::PoolSelector;
use crate::output::{self, OutputFormat};

/// Arguments for grant commands
#[derive(Debug, Args)]
pub struct GrantArgs {
    #[command(subcommand)]
    pub command: GrantCommand,
}

/// Grant subcommands
#[derive(Debug, Subcommand)]
pub enum GrantCommand {
    /// Issue a grant starting now
    Add {
        #[command(flatten)]
        pool: PoolSelector,
        /// Number of seats
        #[arg(long)]
        seats: i32,
        /// Days until the grant expires
        #[arg(long, default_value = "365")]
        expires_in_days: i64,
    },
    /// List a pool's grants, active or not
    List {
        #[command(flatten)]
        pool: PoolSelector,
    },
}

/// Grant display row
#[derive(Debug, Serialize, Tabled)]
struct GrantRow {
    id: String,
    seats: i32,
    issued_at: String,
    expires_at: String,
    active: bool,
}

impl GrantRow {
    fn from_grant(grant: &Grant) -> Self {
        Self {
            id: grant.id.to_string(),
            seats: grant.seat_count,
            issued_at: grant.issued_at.format("%Y-%m-%d %H:%M").to_string(),
            expires_at: grant.expires_at.format("%Y-%m-%d %H:%M").to_string(),
            active: grant.is_active_at(Utc::now()),
        }
    }
}

pub async fn execute(
    args: &GrantArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let grants = GrantRepository::new(pool);

    match &args.command {
        GrantCommand::Add {
            pool,
            seats,
            expires_in_days,
        } => {
            if *expires_in_days <= 0 {
                return Err(AppError::validation("--expires-in-days must be positive"));
            }
            let issued_at = Utc::now();
            let expires_at = issued_at + Duration::days(*expires_in_days);

            let grant = grants
                .create(&pool.pool(), *seats, issued_at, expires_at)
                .await?;

            match format {
                OutputFormat::Json => output::print_json(&grant),
                OutputFormat::Table => output::print_success(&format!(
                    "Granted {} seats to {} until {}",
                    grant.seat_count,
                    pool.pool(),
                    grant.expires_at.to_rfc3339()
                )),
            }
        }
        GrantCommand::List { pool } => {
            let rows: Vec<GrantRow> = grants
                .list_for_pool(&pool.pool())
                .await?
                .iter()
                .map(GrantRow::from_grant)
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
