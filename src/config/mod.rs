//! Repository-to-command configuration.
//!
//! The configuration file is a JSON document:
//!
//! ```json
//! {
//!   "logfile": "/var/log/pipeline-hook.log",
//!   "address": "0.0.0.0",
//!   "port": 8080,
//!   "secret": "s3cret",
//!   "timeout": 600,
//!   "repositories": [
//!     {
//!       "name": "team/app",
//!       "commands": [
//!         { "stage": "deploy", "cmd": "/usr/local/bin/deploy-app" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `secret` and `timeout` are optional. Unknown fields are ignored, and a
//! field set to `null` is treated like a missing one.
//!
//! A [`Configuration`] is an immutable snapshot. Runtime reloads build a new
//! snapshot and swap it into the [`ConfigStore`]; nothing mutates a snapshot
//! that handlers may be reading.

pub mod store;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::types::{ProjectPath, Stage};

pub use store::ConfigStore;

/// Default configuration file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON or does not match the expected shape.
    #[error("cannot parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but holds a value that cannot be used.
    #[error("invalid config file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// One command to run when a stage succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRule {
    /// Stage whose successful build triggers the command.
    pub stage: Stage,

    /// Program to execute. Run verbatim with no arguments and no shell.
    pub cmd: String,
}

impl CommandRule {
    pub fn new(stage: impl Into<Stage>, cmd: impl Into<String>) -> Self {
        CommandRule {
            stage: stage.into(),
            cmd: cmd.into(),
        }
    }
}

/// The commands configured for one project.
///
/// Names are not required to be unique: several rules may share a name and
/// all of them apply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryRule {
    /// Project path, matched exactly against `path_with_namespace`.
    pub name: ProjectPath,

    /// Commands in the order they run.
    #[serde(default, deserialize_with = "null_as_default")]
    pub commands: Vec<CommandRule>,
}

impl RepositoryRule {
    pub fn new(name: impl Into<ProjectPath>, commands: Vec<CommandRule>) -> Self {
        RepositoryRule {
            name: name.into(),
            commands,
        }
    }
}

/// A complete configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Configuration {
    /// Log file path. Empty means log to stderr.
    #[serde(default, deserialize_with = "null_as_default")]
    pub logfile: String,

    /// Host to bind. Empty means all interfaces.
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,

    /// Port to bind.
    #[serde(default, deserialize_with = "null_as_default")]
    pub port: u16,

    /// Shared token expected in `X-Gitlab-Token`. Empty disables the check.
    #[serde(default, deserialize_with = "null_as_default")]
    pub secret: String,

    /// Upper bound on a single command's run time, in seconds.
    #[serde(default, rename = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Repository rules in file order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub repositories: Vec<RepositoryRule>,
}

impl Configuration {
    /// Returns the rules whose name equals `project`, in file order.
    pub fn rules_for<'a>(
        &'a self,
        project: &ProjectPath,
    ) -> impl Iterator<Item = &'a RepositoryRule> {
        self.repositories.iter().filter(move |r| &r.name == project)
    }

    /// Returns the shared secret, or `None` when authentication is disabled.
    pub fn secret(&self) -> Option<&str> {
        if self.secret.is_empty() {
            None
        } else {
            Some(&self.secret)
        }
    }

    /// Returns the per-command timeout, if one is configured.
    ///
    /// A timeout of zero is treated as "no timeout".
    pub fn command_timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Returns the `host:port` string to bind the listener to.
    pub fn bind_addr(&self) -> String {
        let host = match self.address.as_str() {
            "" => "0.0.0.0",
            other => other,
        };
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// Returns the log file path, or `None` for stderr.
    pub fn log_path(&self) -> Option<&Path> {
        if self.logfile.is_empty() {
            None
        } else {
            Some(Path::new(&self.logfile))
        }
    }
}

/// Reads `null` as the type's default, the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Parse`] when it is not valid configuration JSON, and
/// [`ConfigError::Invalid`] when the port is zero.
pub fn load(path: &Path) -> Result<Configuration> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &bytes)
}

/// Parses and validates configuration bytes read from `path`.
///
/// `path` is only used for error messages.
pub fn parse(path: &Path, bytes: &[u8]) -> Result<Configuration> {
    let config: Configuration =
        serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if config.port == 0 {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: "port must be between 1 and 65535".to_string(),
        });
    }

    Ok(config)
}
