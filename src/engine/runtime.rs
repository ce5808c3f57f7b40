// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::DeploymentPlan;
use crate::engine::core::{FailureCause, JobCore};
use crate::engine::job::JobShared;
use crate::errors::DeployError;
use crate::exec::BatchExecutor;
use crate::log::{JobLogger, Severity};
use crate::template::TemplateBuilder;

/// Drives one job through build, grouping and deployment.
///
/// This is the IO shell around [`JobCore`]: it calls the template builder,
/// resolves the plan and executes batches, and feeds every result into the
/// core. The core decides what runs next and how the job ends.
pub struct JobRuntime {
    core: JobCore,
    builder: Arc<dyn TemplateBuilder>,
    executor: BatchExecutor,
    logger: JobLogger,
    shared: Arc<JobShared>,
    batch_size: usize,
}

impl fmt::Debug for JobRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRuntime")
            .field("core", &self.core)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl JobRuntime {
    pub(crate) fn new(
        core: JobCore,
        builder: Arc<dyn TemplateBuilder>,
        executor: BatchExecutor,
        logger: JobLogger,
        shared: Arc<JobShared>,
        batch_size: usize,
    ) -> Self {
        Self {
            core,
            builder,
            executor,
            logger,
            shared,
            batch_size,
        }
    }

    /// Run the job to its terminal state and post the summary.
    pub async fn run(mut self, request_body: String) {
        info!(job_id = %self.core.job_id(), "job runtime started");

        if let Some(plan) = self.build_plan(&request_body).await {
            self.deploy(plan).await;
        }

        self.emit_summary();
        info!(job_id = %self.core.job_id(), state = %self.core.state(), "job runtime exiting");
    }

    /// Building and Grouping. `None` means the job already failed.
    async fn build_plan(&mut self, request_body: &str) -> Option<DeploymentPlan> {
        self.logger.info("Building deployment template");

        let template = match self.builder.build(request_body).await {
            Ok(template) => template,
            Err(e) => {
                self.logger.error(e.to_string());
                self.core.fail_build();
                self.shared.sync(&self.core);
                return None;
            }
        };

        self.logger
            .no_prefix(Severity::Information, "Template accepted. Getting ready to deploy...");
        self.core.begin_grouping();
        self.shared.sync(&self.core);
        self.logger
            .verbose(format!("Template contains {} resources", template.len()));

        match DeploymentPlan::build(&template, self.batch_size) {
            Ok(plan) => Some(plan),
            Err(e) => {
                let cause = match e {
                    DeployError::CyclicDependency(_) => FailureCause::CyclicDependency,
                    _ => FailureCause::Validation,
                };
                self.logger.error(e.to_string());
                self.core.fail_grouping(cause);
                self.shared.sync(&self.core);
                None
            }
        }
    }

    async fn deploy(&mut self, plan: DeploymentPlan) {
        self.logger.info(format!(
            "Deploying {} resources in {} groups ({} batches of at most {})",
            plan.resource_count(),
            plan.groups().len(),
            plan.batches().len(),
            plan.batch_size()
        ));

        self.core.finish_grouping(plan);
        self.shared.sync(&self.core);

        loop {
            if self.shared.cancel_requested() {
                self.logger.warn("Cancellation requested, no further batches will be deployed");
                self.core.cancel();
                break;
            }

            let Some(batch) = self.core.next_batch().cloned() else {
                break;
            };

            self.logger.verbose(format!(
                "Deploying group {} batch {}: {}",
                batch.group_index + 1,
                batch.index + 1,
                batch.names().join(", ")
            ));

            let data = self.executor.execute(&batch).await;
            debug!(
                job_id = %self.core.job_id(),
                status = ?data.status,
                entries = data.log.len(),
                "batch result"
            );

            self.core.record_batch(data.status, data.counters);
            self.shared.sync(&self.core);

            if self.core.state().is_terminal() {
                break;
            }
        }

        if !self.core.state().is_terminal() {
            self.core.finish();
        }
    }

    fn emit_summary(&mut self) {
        if !self.core.state().is_terminal() {
            self.core.fail_internal();
        }
        self.shared.sync(&self.core);

        if let Some(summary) = self.core.take_summary() {
            self.shared.finish(&summary, &self.logger);
        }
    }
}
