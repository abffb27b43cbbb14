//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Content store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Catalog database settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Request path and deploy behavior
    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `REPOSITORY_BASE_PATH` and `DATABASE_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base) = std::env::var("REPOSITORY_BASE_PATH") {
            if !base.trim().is_empty() {
                self.storage.root_dir = PathBuf::from(base);
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.catalog.database_url = url;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(AppError::validation("storage.root_dir is empty"));
        }
        if self.storage.max_upload_bytes == 0 {
            return Err(AppError::validation("storage.max_upload_bytes must be > 0"));
        }
        if !self.catalog.database_url.starts_with("sqlite:") {
            return Err(AppError::validation(format!(
                "catalog.database_url must be a sqlite URL, got '{}'",
                self.catalog.database_url
            )));
        }
        if self.catalog.max_connections == 0 {
            return Err(AppError::validation("catalog.max_connections must be > 0"));
        }
        if self.repository.root_marker.contains('/') {
            return Err(AppError::validation(
                "repository.root_marker must be a single path segment",
            ));
        }
        if self.repository.max_concurrent == 0 {
            return Err(AppError::validation("repository.max_concurrent must be > 0"));
        }
        Ok(())
    }
}

/// Content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the Maven2 directory tree
    #[serde(default = "defaults::root_dir")]
    pub root_dir: PathBuf,

    /// Largest accepted upload in bytes
    #[serde(default = "defaults::max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::root_dir(),
            max_upload_bytes: defaults::max_upload_bytes(),
        }
    }
}

/// Catalog database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite connection URL
    #[serde(default = "defaults::database_url")]
    pub database_url: String,

    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::database_url(),
            max_connections: defaults::max_connections(),
        }
    }
}

/// Request path handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Leading path segment naming the repository (stripped before resolution)
    #[serde(default = "defaults::root_marker")]
    pub root_marker: String,

    /// Concurrent deploys during bulk import
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root_marker: defaults::root_marker(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Storage defaults
    pub fn root_dir() -> PathBuf {
        PathBuf::from("./repository")
    }
    pub fn max_upload_bytes() -> u64 {
        100 * 1024 * 1024
    }

    // Catalog defaults
    pub fn database_url() -> String {
        "sqlite://repository.db".into()
    }
    pub fn max_connections() -> u32 {
        5
    }

    // Repository defaults
    pub fn root_marker() -> String {
        "maven2".into()
    }
    pub fn max_concurrent() -> usize {
        4
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
