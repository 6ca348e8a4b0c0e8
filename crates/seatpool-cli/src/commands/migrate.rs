//! Database migration commands.

use clap::{Args, Subcommand};

use seatpool_core::config::AppConfig;
use seatpool_core::error::AppError;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Apply all pending migrations
    Run,
}

pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;

    match &args.command {
        MigrateCommand::Run => {
            seatpool_database::migration::run_migrations(&pool).await?;
            output::print_success("All migrations applied.");
        }
    }

    Ok(())
}
