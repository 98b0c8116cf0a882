//! Webhook endpoint handler.
//!
//! Checks the shared token, decodes the pipeline payload and dispatches it
//! against the current configuration snapshot. The response is sent once
//! every triggered command has finished.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::dispatch::{DispatchOutcome, dispatch};
use crate::executor::CommandRunner;
use crate::webhooks::{AuthError, DecodeError, TOKEN_HEADER, authenticate, decode};

/// Errors that reject a webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Token missing or wrong.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Payload could not be decoded.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] DecodeError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Optional header `X-Gitlab-Token`: required when a secret is configured
/// - Body: GitLab pipeline event JSON
///
/// # Response
///
/// - 200 OK: dispatch ran (including when nothing matched or a command failed)
/// - 400 Bad Request: body is not a decodable pipeline event
/// - 401 Unauthorized: token missing or wrong
///
/// # Example
///
/// ```ignore
/// POST / HTTP/1.1
/// X-Gitlab-Token: s3cret
/// Content-Type: application/json
///
/// {"object_kind": "pipeline", "builds": [...], "project": {...}}
///
/// HTTP/1.1 200 OK
/// ```
pub async fn webhook_handler<R>(
    State(app_state): State<AppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError>
where
    R: CommandRunner + Send + Sync + 'static,
{
    // One snapshot for the whole request, even if a reload lands mid-dispatch.
    let config = app_state.config().current().await;

    let token = headers.get(TOKEN_HEADER).map(|v| v.as_bytes());

    // Authenticate BEFORE parsing the body.
    if let Err(e) = authenticate(config.secret(), token) {
        warn!(error = %e, "Rejected webhook");
        return Err(e.into());
    }

    let event = match decode(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Undecodable webhook payload");
            return Err(e.into());
        }
    };

    debug!(
        project = %event.project,
        object_kind = event.object_kind.as_deref().unwrap_or("-"),
        builds = event.builds.len(),
        "Received pipeline event"
    );

    let outcome = dispatch(&event, &config, app_state.runner()).await;
    if let DispatchOutcome::Executed(results) = &outcome {
        info!(
            project = %event.project,
            executed = results.len(),
            failed = outcome.failures(),
            "Dispatch finished"
        );
    }

    Ok((StatusCode::OK, "OK"))
}
