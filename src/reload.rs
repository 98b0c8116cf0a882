//! Configuration reload on SIGHUP.
//!
//! The watcher loops until the shutdown token is cancelled. Each hangup
//! re-reads the configuration file through [`ConfigStore::reload`]; a file
//! that fails to load is logged and the previous snapshot stays active.
//!
//! The listen address and log file are applied once at startup. A reload
//! that changes either is accepted for everything else, with a warning.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ConfigStore;

/// Reloads `store` once and logs the outcome.
///
/// Returns true if the new configuration is now active.
pub async fn reload_and_log(store: &ConfigStore) -> bool {
    let previous = store.current().await;

    match store.reload().await {
        Ok(next) => {
            if next.bind_addr() != previous.bind_addr() {
                warn!(
                    active = %previous.bind_addr(),
                    configured = %next.bind_addr(),
                    "Listen address changed; restart to apply"
                );
            }
            if next.logfile != previous.logfile {
                warn!(
                    active = %previous.logfile,
                    configured = %next.logfile,
                    "Log file changed; restart to apply"
                );
            }
            true
        }
        Err(e) => {
            error!(
                path = %store.path().display(),
                error = %e,
                "Configuration reload failed; keeping previous configuration"
            );
            false
        }
    }
}

/// Reloads `store` on every SIGHUP until `shutdown` is cancelled.
///
/// # Errors
///
/// Fails only if the signal handler cannot be installed.
#[cfg(unix)]
pub async fn watch_sighup(
    store: Arc<ConfigStore>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup())?;
    info!(path = %store.path().display(), "Watching for SIGHUP to reload configuration");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received, stopping reload watcher");
                break;
            }
            received = hangups.recv() => {
                if received.is_none() {
                    // Signal stream closed.
                    break;
                }
                info!("SIGHUP received, reloading configuration");
                reload_and_log(&store).await;
            }
        }
    }

    Ok(())
}

/// Without SIGHUP there is nothing to watch; waits for shutdown.
#[cfg(not(unix))]
pub async fn watch_sighup(
    store: Arc<ConfigStore>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    warn!(
        path = %store.path().display(),
        "SIGHUP reload is unavailable on this platform"
    );
    shutdown.cancelled().await;
    Ok(())
}
