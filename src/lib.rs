//! Pipeline Hook - runs local commands when GitLab pipeline stages succeed.
//!
//! This library provides the configuration model, webhook decoding and
//! authentication, command dispatch, and the HTTP server used by the
//! `pipeline-hook` binary.

pub mod config;
pub mod dispatch;
pub mod executor;
pub mod logging;
pub mod reload;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub mod test_utils;
