// src/lib.rs

pub mod cli;
pub mod config;
pub mod credentials;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod generate;
pub mod log;
pub mod logging;
pub mod template;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, default_config_path, load_or_default};
use crate::credentials::{ChainedCredentialProvider, CredentialProvider};
use crate::dag::DeploymentPlan;
use crate::engine::{JobOptions, JobServices, start_job};
use crate::errors::{DeployError, Result};
use crate::exec::HttpResourceApi;
use crate::generate::{HttpTemplateSource, generate_template, write_template};
use crate::log::print_line;
use crate::template::CompiledTemplateBuilder;
use crate::template::request::{
    build_request_body, load_json_document, merge_parameter_overrides, requires_credential,
};

/// Token placed in dry-run requests so secret references pass the build
/// stage. Never sent anywhere.
const DRY_RUN_TOKEN: &str = "dry-run";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - request assembly (template, parameters, overrides, access token)
/// - the job engine with the HTTP resource API
/// - the log polling loop
/// - Ctrl-C handling
///
/// With `--generate-template` it fetches a template instead and stops.
pub async fn run(args: CliArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    debug!(?config, "effective configuration");

    if let Some(filter) = &args.generate_template {
        return run_generate(filter, &args.template_file, &config).await;
    }

    let template = load_json_document(&args.template_file)?;
    let parameter_doc = args
        .template_parameter_file
        .as_ref()
        .map(load_json_document)
        .transpose()?;
    let parameters = merge_parameter_overrides(parameter_doc, &args.parameters)?;

    if args.dry_run {
        return print_dry_run(template, parameters, &config);
    }

    let access_token = acquire_token(&args, &config, &parameters).await?;
    let body = build_request_body(template, parameters, access_token.as_deref())?;

    let services = JobServices::new(
        Arc::new(CompiledTemplateBuilder::new()),
        Arc::new(HttpResourceApi::new(&config.api)?),
    );
    let options = JobOptions {
        batch_size: config.deploy.batch_size,
        verbose: config.deploy.verbose,
        access_token,
    };

    let mut job = start_job(body, services, options);
    info!(job_id = %job.id(), api = %config.api.base_url, "deployment job started");

    // Ctrl-C → stop before the next batch.
    let ctrl_c = {
        let cancel = job.cancel_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            cancel.cancel();
        })
    };

    let interval = config.poll_interval();
    loop {
        let poll = job.next_poll(interval).await;
        for line in &poll.lines {
            print_line(line);
        }
        if poll.is_complete {
            break;
        }
    }
    ctrl_c.abort();

    if job.is_failed() {
        return Err(DeployError::JobFailed(job.id().to_string()));
    }
    Ok(())
}

/// Fetch a generated template, print the envelope and store the template.
async fn run_generate(filter: &str, out: &str, config: &ConfigFile) -> Result<()> {
    let source = HttpTemplateSource::new(&config.api)?;
    let generated = generate_template(&source, filter).await?;

    println!("{}", serde_json::to_string(&generated.envelope)?);

    match &generated.template {
        Some(template) => write_template(out, template),
        None => Err(DeployError::TemplateGeneration(format!(
            "service answered with status {}",
            generated.status_code
        ))),
    }
}

/// Load the config file and layer the CLI flags on top.
///
/// A missing file is only tolerated for the implicit default path.
fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    let config_path = Path::new(&args.config);
    let allow_missing = config_path == default_config_path();
    let file_config = load_or_default(config_path, allow_missing)?;

    let mut raw = RawConfigFile {
        deploy: file_config.deploy,
        api: file_config.api,
        credentials: file_config.credentials,
    };
    if let Some(n) = args.batch_size {
        raw.deploy.batch_size = n;
    }
    if let Some(ms) = args.poll_interval_ms {
        raw.deploy.poll_interval_ms = ms;
    }
    if let Some(url) = &args.api_url {
        raw.api.base_url = url.clone();
    }
    if args.verbose {
        raw.deploy.verbose = true;
    }

    ConfigFile::try_from(raw)
}

/// Fetch an access token if the parameters reference secrets.
async fn acquire_token(
    args: &CliArgs,
    config: &ConfigFile,
    parameters: &Value,
) -> Result<Option<String>> {
    if !requires_credential(parameters) {
        return Ok(None);
    }
    if args.skip_token {
        info!("parameters reference secrets but token acquisition is skipped");
        return Ok(None);
    }

    let provider = ChainedCredentialProvider::from_config(&config.credentials);
    debug!(provider = %provider.name(), "acquiring access token");
    provider.token().await.map(Some)
}

/// Build the template and print the deployment plan without deploying.
fn print_dry_run(template: Value, parameters: Value, config: &ConfigFile) -> Result<()> {
    let token = requires_credential(&parameters).then_some(DRY_RUN_TOKEN);
    let body = build_request_body(template, parameters, token)?;

    let compiled = CompiledTemplateBuilder::new().compile(&body)?;
    let plan = DeploymentPlan::build(&compiled, config.deploy.batch_size)?;

    println!("drmdeploy dry-run");
    println!("  api.base_url = {}", config.api.base_url);
    println!("  deploy.batch_size = {}", plan.batch_size());
    println!();

    println!(
        "resources ({}), groups ({}), batches ({}):",
        plan.resource_count(),
        plan.groups().len(),
        plan.batches().len()
    );
    for group in plan.groups() {
        println!("  group {}: {}", group.index + 1, group.names().join(", "));
        for batch in plan
            .batches()
            .iter()
            .filter(|b| b.group_index == group.index)
        {
            println!("      batch {}: {}", batch.index + 1, batch.names().join(", "));
        }
    }

    debug!("dry-run complete (no deployment)");
    Ok(())
}
