// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};
use serde_json::Value;

/// Command-line arguments for `drmdeploy`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "drmdeploy",
    version,
    about = "Deploy a DRM template against the resource API in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Local path to the template file (JSON). With `--generate-template`
    /// the generated template is written here instead.
    #[arg(long, value_name = "PATH")]
    pub template_file: String,

    /// Ask the service to generate a template for FILTER and write it to
    /// the template file. Nothing is deployed.
    #[arg(
        long,
        value_name = "FILTER",
        conflicts_with_all = ["template_parameter_file", "parameters", "dry_run"]
    )]
    pub generate_template: Option<String>,

    /// File holding the template parameters (JSON).
    #[arg(long, value_name = "PATH")]
    pub template_parameter_file: Option<String>,

    /// Parameter value as NAME=VALUE. VALUE is read as JSON when it parses,
    /// otherwise as a plain string. Overrides entries from the parameter file.
    #[arg(
        long = "parameter",
        short = 'p',
        value_name = "NAME=VALUE",
        value_parser = parse_parameter_override
    )]
    pub parameters: Vec<(String, Value)>,

    /// Path to the config file (TOML). Missing default file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Drmdeploy.toml")]
    pub config: String,

    /// Maximum number of resources deployed in parallel.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Interval between job log polls, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Base URL of the resource API.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Include verbose entries in the job log.
    #[arg(long)]
    pub verbose: bool,

    /// Do not try to acquire an access token, even if the parameters
    /// reference secrets.
    #[arg(long)]
    pub skip_token: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DRMDEPLOY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build the template and print the deployment plan, but don't deploy.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse a `NAME=VALUE` parameter override.
pub fn parse_parameter_override(s: &str) -> Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{s}' (expected NAME=VALUE)"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid parameter '{s}' (empty name)"));
    }

    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
