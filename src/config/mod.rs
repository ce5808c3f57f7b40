// src/config/mod.rs

//! Configuration loading and validation for drmdeploy.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: read from disk, apply environment overrides.
//! - `validate.rs`: `TryFrom<RawConfigFile> for ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ApiSection, ConfigFile, CredentialsSection, DeploySection, RawConfigFile, DEFAULT_BATCH_SIZE,
    DEFAULT_POLL_INTERVAL_MS,
};
