// src/exec/executor.rs

//! Batch executor: deploy every resource of a batch concurrently.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::Batch;
use crate::exec::backend::{DeployContext, ResourceApi, ResourceOutcome};
use crate::log::{JobLogger, LogEntry};
use crate::template::Resource;
use crate::types::{BatchStatus, RequestCounters};

/// Result of executing one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployGroupData {
    pub status: BatchStatus,
    /// Entries emitted while the batch ran, in emission order per resource.
    pub log: Vec<LogEntry>,
    /// Counters of every resource that deployed.
    pub counters: RequestCounters,
}

/// What one resource task hands back.
struct ResourceReport {
    outcome: ResourceOutcome,
    log: Vec<LogEntry>,
}

/// Runs batches against a [`ResourceApi`].
///
/// One tokio task is spawned per resource. Outcomes are collected
/// independently: a failing resource does not cancel its siblings, and a
/// panicking task is reported as an exception for that resource.
#[derive(Clone)]
pub struct BatchExecutor {
    api: Arc<dyn ResourceApi>,
    context: Arc<DeployContext>,
    logger: JobLogger,
}

impl BatchExecutor {
    pub fn new(api: Arc<dyn ResourceApi>, context: DeployContext, logger: JobLogger) -> Self {
        Self {
            api,
            context: Arc::new(context),
            logger,
        }
    }

    pub async fn execute(&self, batch: &Batch) -> DeployGroupData {
        debug!(
            group = batch.group_index,
            batch = batch.index,
            resources = ?batch.names(),
            "executing batch"
        );

        let handles: Vec<(String, JoinHandle<ResourceReport>)> = batch
            .resources
            .iter()
            .map(|resource| (resource.name.clone(), self.spawn_resource(resource.clone())))
            .collect();

        let mut has_failures = false;
        let mut has_exception = false;
        let mut counters = RequestCounters::default();
        let mut log = Vec::new();

        for (name, handle) in handles {
            match handle.await {
                Ok(report) => {
                    match report.outcome {
                        ResourceOutcome::Success(c) => counters += c,
                        ResourceOutcome::ApplicationFailure(_) => has_failures = true,
                        ResourceOutcome::InfrastructureException(_) => has_exception = true,
                    }
                    log.extend(report.log);
                }
                Err(join_err) => {
                    warn!(resource = %name, error = %join_err, "resource task did not complete");
                    has_exception = true;
                    log.push(self.logger.error(format!(
                        "Resource '{name}' could not be deployed, the deployment task crashed: {join_err}"
                    )));
                }
            }
        }

        let status = if has_exception {
            BatchStatus::ExceptionThrown
        } else if has_failures {
            BatchStatus::Failures
        } else {
            BatchStatus::Ok
        };

        info!(
            group = batch.group_index,
            batch = batch.index,
            ?status,
            requests = counters.total(),
            "batch finished"
        );

        DeployGroupData {
            status,
            log,
            counters,
        }
    }

    fn spawn_resource(&self, resource: Resource) -> JoinHandle<ResourceReport> {
        let api = Arc::clone(&self.api);
        let context = Arc::clone(&self.context);
        let logger = self.logger.clone();

        tokio::spawn(async move {
            let mut log = Vec::new();
            log.extend(logger.verbose(format!(
                "Deploying resource '{}' of type '{}'",
                resource.name, resource.resource_type
            )));

            let outcome = api.deploy(&resource, &context).await;

            let entry = match &outcome {
                ResourceOutcome::Success(counters) => logger.info(format!(
                    "Resource '{}' deployed ({} requests)",
                    resource.name,
                    counters.total()
                )),
                ResourceOutcome::ApplicationFailure(detail) => logger.error(format!(
                    "Resource '{}' failed to deploy: {detail}",
                    resource.name
                )),
                ResourceOutcome::InfrastructureException(detail) => logger.error(format!(
                    "Resource '{}' could not be deployed, exception: {detail}",
                    resource.name
                )),
            };
            log.push(entry);

            ResourceReport { outcome, log }
        })
    }
}
