// src/config.rs

//! Configuration loading.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Load configuration from a TOML file and apply environment overrides.
///
/// A missing file falls back to defaults. A file that exists but does not
/// parse is an error. Runs before logging is set up, so callers report
/// which case applied.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();
    Ok(config)
}
