//! Seat assignment command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use seatpool_allocator::{AllocationError, AssignRequest};
use seatpool_core::config::AppConfig;
use seatpool_core::error::AppError;
use seatpool_core::types::{AllocationPolicy, RequesterId};
use seatpool_entity::allocation::AssignResult;

use super::PoolSelector;
use crate::output::{self, OutputFormat};

/// Arguments for the assign command
#[derive(Debug, Args)]
pub struct AssignArgs {
    #[command(flatten)]
    pub pool: PoolSelector,
    /// Requester IDs, highest priority first
    #[arg(long = "requester", required = true, num_args = 1..)]
    pub requesters: Vec<RequesterId>,
    /// `all_or_nothing` or `partial_fill`; defaults to the configured policy
    #[arg(long)]
    pub policy: Option<String>,
}

/// One requester's result
#[derive(Debug, Serialize, Tabled)]
struct AssignRow {
    requester: String,
    status: &'static str,
}

pub async fn execute(
    args: &AssignArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let policy = match &args.policy {
        Some(name) => name
            .parse::<AllocationPolicy>()
            .map_err(|e| AppError::from(AllocationError::from(e)))?,
        None => config.allocator.default_policy,
    };

    let pool = super::create_db_pool(config).await?;
    let allocator = super::create_allocator(config, pool);
    let request = AssignRequest::new(
        args.pool.tenant,
        args.pool.resource,
        args.requesters.clone(),
        policy,
    );

    match allocator.assign(&request).await {
        Ok(result) => {
            print_result(&result, format);
            Ok(())
        }
        Err(AllocationError::CapacityExceeded {
            requested,
            available,
        }) => {
            output::print_warning(&format!(
                "Not enough seats: {requested} requested, {available} available. \
                 Nothing was assigned."
            ));
            Err(AllocationError::CapacityExceeded {
                requested,
                available,
            }
            .into())
        }
        Err(AllocationError::InvariantViolation { pool, total, used }) => {
            output::print_warning(&format!(
                "Pool {pool} is oversubscribed: {used} holders for {total} seats. \
                 Unassign seats or add a grant before assigning more."
            ));
            Err(AllocationError::InvariantViolation { pool, total, used }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_result(result: &AssignResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(result),
        OutputFormat::Table => {
            let rows: Vec<AssignRow> = result
                .assigned
                .iter()
                .map(|id| AssignRow {
                    requester: id.to_string(),
                    status: "assigned",
                })
                .chain(result.overflow.iter().map(|id| AssignRow {
                    requester: id.to_string(),
                    status: "overflow",
                }))
                .collect();
            if !rows.is_empty() {
                output::print_list(&rows, format);
            }
            output::print_kv("Outcome", result.outcome.as_str());
            output::print_kv("Assigned", &result.assigned.len().to_string());
            output::print_kv("Overflow", &result.overflow.len().to_string());
        }
    }
}
