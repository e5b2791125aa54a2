//! toomany: a rate-limited upstream for gateway integration tests
//!
//! `GET /healthcheck` answers `200 ok`; every `POST` to a non-empty path
//! answers `429 You're making too many requests`. Listens on `0.0.0.0:8000`
//! unless told otherwise, exits 0 on SIGINT/SIGTERM and 1 if it cannot bind.

mod cli;
mod logging;

use clap::Parser;
use std::process::ExitCode;
use toomany_core::{stub_routes, Server};
use tracing::{error, info, warn};

use crate::cli::Cli;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.logging_config()) {
        eprintln!("toomany: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            eprintln!("toomany: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> toomany_core::Result<()> {
    let config = cli.server_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = Server::bind(&config, stub_routes()?)?;
        info!(
            addr = %server.local_addr()?,
            workers = config.workers,
            "toomany listening"
        );
        server.serve(shutdown_signal()).await
    })
}

/// Resolves on SIGINT or (on unix) SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
