//! Pool status command.

use clap::{Args, Subcommand};
use serde::Serialize;

use seatpool_allocator::AllocationError;
use seatpool_core::config::AppConfig;
use seatpool_core::error::AppError;
use seatpool_core::types::PoolId;
use seatpool_database::{AssignmentRepository, GrantRepository};
use seatpool_entity::allocation::CapacityDetails;

use super::PoolSelector;
use crate::output::{self, OutputFormat};

/// Arguments for pool commands
#[derive(Debug, Args)]
pub struct PoolArgs {
    #[command(subcommand)]
    pub command: PoolCommand,
}

/// Pool subcommands
#[derive(Debug, Subcommand)]
pub enum PoolCommand {
    /// Show seats, holders, and free capacity
    Status {
        #[command(flatten)]
        pool: PoolSelector,
    },
}

#[derive(Debug, Serialize)]
struct PoolStatus {
    pool: PoolId,
    total: u64,
    used: u64,
    available: u64,
    usage_percent: f64,
    grants: usize,
    assignment_rows: u64,
}

pub async fn execute(
    args: &PoolArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let PoolCommand::Status { pool } = &args.command;
    let pool_id = pool.pool();

    let db = super::create_db_pool(config).await?;
    let allocator = super::create_allocator(config, db.clone());
    let details = match allocator.pool_details(&pool_id).await {
        Ok(details) => details,
        Err(AllocationError::InvariantViolation { total, used, .. }) => {
            output::print_warning(&format!(
                "Pool is oversubscribed: {used} live holders for {total} seats"
            ));
            CapacityDetails {
                total,
                used,
                available: 0,
            }
        }
        Err(e) => return Err(e.into()),
    };
    let grants = GrantRepository::new(db.clone()).list_for_pool(&pool_id).await?;
    let assignment_rows = AssignmentRepository::new(db)
        .count_for_pool(&pool_id)
        .await?;

    let status = PoolStatus {
        pool: pool_id,
        total: details.total,
        used: details.used,
        available: details.available,
        usage_percent: details.usage_percent(),
        grants: grants.len(),
        assignment_rows,
    };

    match format {
        OutputFormat::Json => output::print_json(&status),
        OutputFormat::Table => {
            println!("Pool {}", status.pool);
            output::print_kv("Total seats", &status.total.to_string());
            output::print_kv("Live holders", &status.used.to_string());
            output::print_kv("Available", &status.available.to_string());
            output::print_kv("Usage", &format!("{:.1}%", status.usage_percent));
            output::print_kv("Grants", &status.grants.to_string());
            output::print_kv("Assignment rows", &status.assignment_rows.to_string());
            if status.total == 0 && status.assignment_rows > 0 {
                output::print_warning(&format!(
                    "{} assignment(s) are dormant until a grant is active",
                    status.assignment_rows
                ));
            }
        }
    }

    Ok(())
}
