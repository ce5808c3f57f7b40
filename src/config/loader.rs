// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DeployError, Result};

/// Environment variables that override `[deploy].batch_size`, highest
/// priority first. The second one is the name the batch cap has always had.
pub const BATCH_SIZE_ENV_VARS: [&str; 2] = ["DRMDEPLOY_BATCH_SIZE", "ParallelDeployGroupBatch"];

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, apply environment overrides, and
/// validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw_config = load_from_path(&path)?;
    apply_env_overrides(&mut raw_config, |key| std::env::var(key).ok())?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults
/// (still subject to environment overrides) when `allow_missing` is set.
///
/// The CLI sets `allow_missing` only for the implicit default path; an
/// explicitly given `--config` that does not exist is an error.
pub fn load_or_default(path: impl AsRef<Path>, allow_missing: bool) -> Result<ConfigFile> {
    let path = path.as_ref();
    if allow_missing && !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        let mut raw = RawConfigFile::default();
        apply_env_overrides(&mut raw, |key| std::env::var(key).ok())?;
        return ConfigFile::try_from(raw);
    }
    load_and_validate(path)
}

/// Apply environment overrides on top of the file values.
///
/// `lookup` abstracts `std::env::var` so tests don't have to mutate the
/// process environment.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    for key in BATCH_SIZE_ENV_VARS {
        if let Some(value) = lookup(key) {
            let parsed = value.trim().parse::<usize>().map_err(|_| {
                DeployError::ConfigError(format!(
                    "{key} must be a positive integer (got '{value}')"
                ))
            })?;
            debug!(env = key, batch_size = parsed, "batch size overridden from environment");
            raw.deploy.batch_size = parsed;
            break;
        }
    }
    Ok(())
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Drmdeploy.toml")
}
