//! `roster-migrate`: waits for the database, then applies pending migrations.

use std::process::ExitCode;

use clap::Parser;
use roster_server::backoff::ExponentialBackoff;
use roster_server::config::MigrateArgs;
use roster_server::storage::migrate::{run_migrations, wait_until_reachable};
use roster_server::storage::sql::lazy_pool;
use roster_server::telemetry::init_tracing;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = MigrateArgs::parse();
    init_tracing(args.log_format);

    let pool = match lazy_pool(&args.database.to_config()) {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "invalid database configuration");
            return ExitCode::FAILURE;
        }
    };

    wait_until_reachable(&pool, ExponentialBackoff::default()).await;

    let code = match run_migrations(&pool).await {
        Ok(()) => {
            info!("migrations applied");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "migration failed");
            ExitCode::FAILURE
        }
    };
    pool.close().await;
    code
}
