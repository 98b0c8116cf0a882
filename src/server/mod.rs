//! HTTP server for the webhook receiver.
//!
//! # Endpoints
//!
//! - `POST /` - Accepts GitLab pipeline webhooks (`POST /webhook` is an alias)
//! - `GET /health` - Returns 200 if the server is running
//!
//! Handlers return errors as values. A panic inside a handler is caught by
//! [`CatchPanicLayer`] and turned into a 500 for that request only.

use std::sync::Arc;

use axum::http::StatusCode;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::config::ConfigStore;
use crate::executor::{CommandRunner, ProcessRunner};

pub mod webhook;

pub use webhook::{WebhookError, webhook_handler};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. The config
/// store is shared with the reload task, so a reload is visible to the next
/// request without rebuilding the router.
pub struct AppState<R = ProcessRunner> {
    inner: Arc<AppStateInner<R>>,
}

struct AppStateInner<R> {
    config: Arc<ConfigStore>,
    runner: R,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> AppState<R> {
    pub fn new(config: Arc<ConfigStore>, runner: R) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { config, runner }),
        }
    }

    /// Returns the configuration store.
    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    /// Returns the command runner.
    pub fn runner(&self) -> &R {
        &self.inner.runner
    }
}

/// Health check handler.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the axum Router with all endpoints.
pub fn build_router<R>(app_state: AppState<R>) -> axum::Router
where
    R: CommandRunner + Send + Sync + 'static,
{
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", post(webhook_handler::<R>))
        .route("/webhook", post(webhook_handler::<R>))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(app_state)
}
