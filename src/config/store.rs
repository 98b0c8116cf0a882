//! The active configuration snapshot and its reload path.
//!
//! Readers take a short read lock, clone the `Arc`, and release the lock
//! before doing any work. A reload parses the whole file first and only then
//! takes the write lock to swap the pointer, so a reader sees either the old
//! snapshot or the new one, and a failed reload leaves the old one in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{ConfigError, Configuration, Result, load, parse};

/// Holds the configuration file path and the active snapshot.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<Configuration>>,
}

impl ConfigStore {
    /// Loads the configuration at `path` and makes it the active snapshot.
    ///
    /// # Errors
    ///
    /// Returns the load error unchanged; at startup this is fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load(&path)?;
        Ok(ConfigStore::with_config(path, config))
    }

    /// Creates a store around an already-loaded configuration.
    pub fn with_config(path: impl Into<PathBuf>, config: Configuration) -> Self {
        ConfigStore {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Returns the configuration file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the latest successfully loaded snapshot.
    pub async fn current(&self) -> Arc<Configuration> {
        self.current.read().await.clone()
    }

    /// Re-reads the configuration file and swaps in the result.
    ///
    /// On error the active snapshot is unchanged.
    pub async fn reload(&self) -> Result<Arc<Configuration>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;
        let config = parse(&self.path, &bytes)?;

        let snapshot = self.replace(config).await;
        info!(
            path = %self.path.display(),
            repositories = snapshot.repositories.len(),
            "Configuration reloaded"
        );
        Ok(snapshot)
    }

    /// Swaps `config` in as the active snapshot and returns it.
    pub async fn replace(&self, config: Configuration) -> Arc<Configuration> {
        let snapshot = Arc::new(config);
        let mut guard = self.current.write().await;
        *guard = Arc::clone(&snapshot);
        debug!("Configuration snapshot swapped");
        snapshot
    }
}
