// src/credentials.rs

//! Access token acquisition for requests that reference secrets.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::CredentialsSection;
use crate::errors::{DeployError, Result};
use crate::types::BoxFuture;

/// Source of the access token injected into the request body.
pub trait CredentialProvider: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> String;

    fn token(&self) -> BoxFuture<'_, Result<String>>;
}

/// Reads a ready-made token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> String {
        format!("env:{}", self.var)
    }

    fn token(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            match std::env::var(&self.var) {
                Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(DeployError::Credential(format!(
                    "environment variable '{}' is not set",
                    self.var
                ))),
            }
        })
    }
}

/// Runs a shell command and takes the first non-empty stdout line.
#[derive(Debug, Clone)]
pub struct CommandCredentialProvider {
    command: String,
}

impl CommandCredentialProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    async fn run(&self) -> Result<String> {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %self.command, "running token command");
        let output = cmd.output().await.map_err(|e| {
            DeployError::Credential(format!("failed to run token command '{}': {e}", self.command))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Credential(format!(
                "token command '{}' exited with {}: {}",
                self.command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DeployError::Credential(format!(
                    "token command '{}' printed no token",
                    self.command
                ))
            })
    }
}

impl CredentialProvider for CommandCredentialProvider {
    fn name(&self) -> String {
        format!("command:{}", self.command)
    }

    fn token(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.run())
    }
}

/// Tries each provider in turn; the first token wins.
#[derive(Clone, Default)]
pub struct ChainedCredentialProvider {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl ChainedCredentialProvider {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    /// Environment variable first, then the token command if configured.
    pub fn from_config(config: &CredentialsSection) -> Self {
        let mut providers: Vec<Arc<dyn CredentialProvider>> =
            vec![Arc::new(EnvCredentialProvider::new(&config.token_env))];
        if let Some(command) = &config.token_command {
            providers.push(Arc::new(CommandCredentialProvider::new(command)));
        }
        Self::new(providers)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    async fn first_token(&self) -> Result<String> {
        let mut tried = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.token().await {
                Ok(token) => {
                    info!(provider = %provider.name(), "acquired access token");
                    return Ok(token);
                }
                Err(e) => {
                    debug!(provider = %provider.name(), error = %e, "credential provider failed");
                    tried.push(e.to_string());
                }
            }
        }

        Err(DeployError::Credential(if tried.is_empty() {
            "no credential provider configured".to_string()
        } else {
            format!("no access token available ({})", tried.join("; "))
        }))
    }
}

impl CredentialProvider for ChainedCredentialProvider {
    fn name(&self) -> String {
        let names: Vec<String> = self.providers.iter().map(|p| p.name()).collect();
        format!("chain[{}]", names.join(", "))
    }

    fn token(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.first_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl CredentialProvider for Fixed {
        fn name(&self) -> String {
            "fixed".to_string()
        }

        fn token(&self) -> BoxFuture<'_, Result<String>> {
            Box::pin(async move {
                self.0
                    .map(str::to_string)
                    .ok_or_else(|| DeployError::Credential("none".to_string()))
            })
        }
    }

    #[tokio::test]
    async fn chain_returns_first_success() {
        let chain = ChainedCredentialProvider::new(vec![
            Arc::new(Fixed(None)),
            Arc::new(Fixed(Some("tok-2"))),
            Arc::new(Fixed(Some("tok-3"))),
        ]);
        assert_eq!(chain.token().await.unwrap(), "tok-2");
    }

    #[tokio::test]
    async fn empty_chain_fails() {
        let err = ChainedCredentialProvider::default().token().await.unwrap_err();
        assert!(matches!(err, DeployError::Credential(_)));
    }

    #[tokio::test]
    async fn unset_env_var_fails() {
        let provider = EnvCredentialProvider::new("DRMDEPLOY_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(provider.token().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_takes_first_non_empty_line() {
        let provider = CommandCredentialProvider::new("printf '\\n  abc123  \\nsecond\\n'");
        assert_eq!(provider.token().await.unwrap(), "abc123");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_a_credential_error() {
        let provider = CommandCredentialProvider::new("exit 3");
        let err = provider.token().await.unwrap_err();
        assert!(err.to_string().contains("exited with 3"));
    }

    #[test]
    fn config_chain_includes_command_when_set() {
        let mut section = CredentialsSection::default();
        assert_eq!(ChainedCredentialProvider::from_config(&section).len(), 1);
        section.token_command = Some("echo tok".to_string());
        assert_eq!(ChainedCredentialProvider::from_config(&section).len(), 2);
    }
}
