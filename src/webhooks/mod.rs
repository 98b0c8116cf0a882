//! Webhook handling for GitLab pipeline events.
//!
//! This module provides:
//! - The shared-secret token check (`X-Gitlab-Token`)
//! - Payload decoding into a normalized [`PipelineEvent`]

pub mod events;
pub mod parser;
pub mod token;

pub use events::{BuildOutcome, BuildStatus, PipelineEvent};
pub use parser::{DecodeError, decode};
pub use token::{AuthError, TOKEN_HEADER, authenticate, tokens_match};
