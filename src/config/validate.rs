// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DeployError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DeployError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.deploy, raw.api, raw.credentials))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_deploy_section(cfg)?;
    validate_api_section(cfg)?;
    validate_credentials_section(cfg)?;
    Ok(())
}

fn validate_deploy_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.deploy.batch_size == 0 {
        return Err(DeployError::ConfigError(
            "[deploy].batch_size must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.deploy.poll_interval_ms == 0 {
        return Err(DeployError::ConfigError(
            "[deploy].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_api_section(cfg: &RawConfigFile) -> Result<()> {
    let url = cfg.api.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(DeployError::ConfigError(format!(
            "[api].base_url must be an http(s) URL (got '{}')",
            cfg.api.base_url
        )));
    }

    if cfg.api.timeout_secs == Some(0) {
        return Err(DeployError::ConfigError(
            "[api].timeout_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_credentials_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.credentials.token_env.trim().is_empty() {
        return Err(DeployError::ConfigError(
            "[credentials].token_env must not be empty".to_string(),
        ));
    }

    if let Some(cmd) = &cfg.credentials.token_command {
        if cmd.trim().is_empty() {
            return Err(DeployError::ConfigError(
                "[credentials].token_command must not be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}
