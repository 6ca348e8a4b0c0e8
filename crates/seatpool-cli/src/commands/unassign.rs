//! Seat release command.

use clap::Args;

use seatpool_core::config::AppConfig;
use seatpool_core::error::AppError;
use seatpool_core::types::RequesterId;
use seatpool_database::AssignmentRepository;

use super::PoolSelector;
use crate::output;

/// Arguments for the unassign command
#[derive(Debug, Args)]
pub struct UnassignArgs {
    #[command(flatten)]
    pub pool: PoolSelector,
    /// Requester IDs whose seats are freed
    #[arg(
        long = "requester",
        num_args = 1..,
        required_unless_present = "all",
        conflicts_with = "all"
    )]
    pub requesters: Vec<RequesterId>,
    /// Free every seat in the pool
    #[arg(long)]
    pub all: bool,
    /// Skip the confirmation prompt for --all
    #[arg(long, requires = "all")]
    pub force: bool,
}

pub async fn execute(args: &UnassignArgs, config: &AppConfig) -> Result<(), AppError> {
    let pool_id = args.pool.pool();

    if args.all && !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Free every seat in pool {pool_id}?"))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let pool = super::create_db_pool(config).await?;
    let assignments = AssignmentRepository::new(pool);

    let removed = if args.all {
        assignments.unassign_all(&pool_id).await?
    } else {
        assignments.unassign(&pool_id, &args.requesters).await?
    };

    tracing::info!(pool = %pool_id, removed, "Seats freed");
    if removed == 0 {
        output::print_warning("No matching seats were held.");
    } else {
        output::print_success(&format!("Freed {removed} seat(s) in {pool_id}"));
    }
    Ok(())
}
