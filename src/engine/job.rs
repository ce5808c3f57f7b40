// src/engine/job.rs

//! Job handles: starting a job and observing it from the caller side.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::engine::core::{FailureCause, JobCore};
use crate::engine::runtime::JobRuntime;
use crate::exec::{BatchExecutor, DeployContext, ResourceApi};
use crate::log::{JobLogger, JobSummary, LogChannel, LogStream, PollLog};
use crate::template::TemplateBuilder;
use crate::types::JobState;

/// New random job identifier: 32 lowercase hex characters.
pub fn new_job_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Collaborators a job talks to.
#[derive(Clone)]
pub struct JobServices {
    pub builder: Arc<dyn TemplateBuilder>,
    pub api: Arc<dyn ResourceApi>,
}

impl JobServices {
    pub fn new(builder: Arc<dyn TemplateBuilder>, api: Arc<dyn ResourceApi>) -> Self {
        Self { builder, api }
    }
}

/// Per-job knobs.
#[derive(Clone)]
pub struct JobOptions {
    /// Upper bound on resources deployed at once.
    pub batch_size: usize,
    /// Emit verbose job log entries.
    pub verbose: bool,
    /// Bearer token handed to the resource API.
    pub access_token: Option<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            verbose: false,
            access_token: None,
        }
    }
}

impl std::fmt::Debug for JobOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOptions")
            .field("batch_size", &self.batch_size)
            .field("verbose", &self.verbose)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// State shared between the running job and its handle.
#[derive(Debug, Default)]
pub(crate) struct JobShared {
    failed: AtomicBool,
    finished: AtomicBool,
    cancel_requested: AtomicBool,
    total_requests: AtomicU64,
    state: Mutex<JobState>,
}

impl JobShared {
    pub(crate) fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mirror the core after a step.
    pub(crate) fn sync(&self, core: &JobCore) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = core.state();
        self.total_requests
            .store(core.totals().total(), Ordering::Release);
        if core.deployment_failed() {
            self.failed.store(true, Ordering::Release);
        }
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Publish the outcome, then post the summary. `failed` is visible to
    /// anyone who has seen the summary.
    pub(crate) fn finish(&self, summary: &JobSummary, logger: &JobLogger) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = summary.status;
        self.total_requests
            .store(summary.total_requests, Ordering::Release);
        self.failed
            .store(summary.status == JobState::Failed, Ordering::Release);
        logger.summary(summary);
    }
}

/// Requests cancellation of a running job. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<JobShared>,
}

impl CancelHandle {
    /// Ask the job to stop before its next batch. Batches already running
    /// finish; nothing is rolled back.
    pub fn cancel(&self) {
        self.shared.cancel_requested.store(true, Ordering::Release);
    }
}

/// Caller side of a running job.
#[derive(Debug)]
pub struct JobHandle {
    id: String,
    stream: LogStream,
    shared: Arc<JobShared>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drain and render whatever the job has logged so far.
    pub fn poll_log(&mut self) -> PollLog {
        self.stream.poll()
    }

    /// Wait up to `interval` (less if the job finishes), then poll.
    pub async fn next_poll(&mut self, interval: Duration) -> PollLog {
        self.stream.next_poll(interval).await
    }

    /// Whether the summary has been drained.
    pub fn is_complete(&self) -> bool {
        self.stream.is_complete()
    }

    /// Whether the job ended in `Failed`. Valid once the summary was seen.
    pub fn is_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> JobState {
        self.shared.state()
    }

    pub fn total_requests(&self) -> u64 {
        self.shared.total_requests.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Start a deployment job for `request_body` and return immediately.
///
/// The job runs on a background Tokio task; this must be called from
/// within a Tokio runtime. A supervising task guarantees a summary entry
/// even if the orchestration task panics.
pub fn start_job(request_body: String, services: JobServices, options: JobOptions) -> JobHandle {
    let id = new_job_id();
    let channel = Arc::new(LogChannel::new());
    let shared = Arc::new(JobShared::default());
    let logger = JobLogger::new(id.as_str(), Arc::clone(&channel), options.verbose);

    info!(job_id = %id, batch_size = options.batch_size, "starting job");

    let executor = BatchExecutor::new(
        services.api,
        DeployContext::new(id.clone(), options.access_token),
        logger.clone(),
    );
    let runtime = JobRuntime::new(
        JobCore::new(id.clone()),
        services.builder,
        executor,
        logger.clone(),
        Arc::clone(&shared),
        options.batch_size,
    );

    let supervised = Arc::clone(&shared);
    let job_id = id.clone();
    tokio::spawn(async move {
        let outcome = tokio::spawn(runtime.run(request_body)).await;

        if let Err(join_err) = outcome {
            error!(job_id = %job_id, error = %join_err, "job orchestration task crashed");
            if !supervised.is_finished() {
                logger.error(format!("Unexpected error while deploying: {join_err}"));
                let summary = JobSummary {
                    job_id: job_id.clone(),
                    status: JobState::Failed,
                    total_requests: supervised.total_requests.load(Ordering::Acquire),
                    message: FailureCause::InternalFault.message().to_string(),
                };
                supervised.finish(&summary, &logger);
            }
        }
    });

    JobHandle {
        id,
        stream: LogStream::new(channel),
        shared,
    }
}
