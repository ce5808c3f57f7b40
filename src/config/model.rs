// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Default parallel batch size, historically `ParallelDeployGroupBatch`.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default interval between job log polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [deploy]
/// batch_size = 5
/// poll_interval_ms = 2000
/// verbose = false
///
/// [api]
/// base_url = "http://localhost:7071/api"
/// timeout_secs = 30
///
/// [credentials]
/// token_env = "DRMDEPLOY_ACCESS_TOKEN"
/// token_command = "az account get-access-token --query accessToken -o tsv"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub credentials: CredentialsSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub deploy: DeploySection,
    pub api: ApiSection,
    pub credentials: CredentialsSection,
}

impl ConfigFile {
    /// Assemble a config without running validation. Used by `TryFrom`
    /// once the raw file has been checked.
    pub(crate) fn new_unchecked(
        deploy: DeploySection,
        api: ApiSection,
        credentials: CredentialsSection,
    ) -> Self {
        Self {
            deploy,
            api,
            credentials,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.deploy.poll_interval_ms)
    }
}

/// `[deploy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// Maximum number of resources of one dependency group deployed at once.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How often the caller loop drains the job log.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether verbose job log entries are produced at all.
    #[serde(default)]
    pub verbose: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            verbose: false,
        }
    }
}

/// `[api]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout of the HTTP client. `None` means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:7071/api".to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

/// `[credentials]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsSection {
    /// Environment variable holding a ready-made access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Shell command printing an access token on stdout.
    #[serde(default)]
    pub token_command: Option<String>,
}

fn default_token_env() -> String {
    "DRMDEPLOY_ACCESS_TOKEN".to_string()
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            token_command: None,
        }
    }
}
