use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pipeline_hook::config::{ConfigError, ConfigStore, DEFAULT_CONFIG_PATH};
use pipeline_hook::executor::ProcessRunner;
use pipeline_hook::logging::{self, LoggingError};
use pipeline_hook::reload::watch_sighup;
use pipeline_hook::server::{AppState, build_router};

/// Runs local commands when GitLab pipeline stages succeed.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet.
            eprintln!("pipeline-hook: {e}");
            error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let store = Arc::new(ConfigStore::open(&cli.config)?);
    let config = store.current().await;

    logging::init(config.log_path())?;
    info!(
        path = %cli.config.display(),
        repositories = config.repositories.len(),
        secret = config.secret().is_some(),
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();

    let watcher = tokio::spawn(watch_sighup(Arc::clone(&store), shutdown.clone()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("listening on {}", addr);

    let app = build_router(AppState::new(Arc::clone(&store), ProcessRunner));

    let serve_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            serve_shutdown.cancel();
        })
        .await
        .map_err(StartupError::Serve);

    // Stop the watcher even if the server exited on its own.
    shutdown.cancel();
    match watcher.await {
        Ok(Err(e)) => error!(error = %e, "Reload watcher failed"),
        Err(e) => error!(error = %e, "Reload watcher panicked"),
        Ok(Ok(())) => {}
    }

    served?;
    info!("Shut down cleanly");
    Ok(())
}

/// Completes on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
