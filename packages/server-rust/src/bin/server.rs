//! `roster-server`: serves the record service until a signal or a listener
//! failure ends the lifecycle group.

use std::process::ExitCode;

use clap::Parser;
use roster_server::config::ServerArgs;
use roster_server::lifecycle::{signal_actor, LifecycleGroup};
use roster_server::telemetry::init_tracing;
use roster_server::Server;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = format!("{e:#}"), "startup failed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        rpc = %server.rpc_addr(),
        http = %server.http_addr(),
        store = ?config.store.kind,
        "roster-server started"
    );

    let mut group = LifecycleGroup::new();
    let (run, interrupt) = signal_actor();
    group.add("signal", run, interrupt);

    match server.run(group).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "roster-server exited");
            ExitCode::FAILURE
        }
    }
}
