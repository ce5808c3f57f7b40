// src/engine/core.rs

//! Pure job state machine.
//!
//! [`JobCore`] owns the job state, the deployment plan cursor and the
//! running totals. It decides which batch runs next and which summary ends
//! the job. The async shell (`engine::runtime::JobRuntime`) performs the
//! actual building, resolving and deploying and feeds the results back in.
//!
//! The core has no Tokio types, does no IO and is unit tested directly.

use tracing::{debug, warn};

use crate::dag::{Batch, DeploymentPlan};
use crate::log::JobSummary;
use crate::types::{BatchStatus, JobState, RequestCounters};

pub const MSG_SUCCESS: &str = "Deployment successful";
pub const MSG_VALIDATION: &str = "Validation failed, please check the log for errors.";
pub const MSG_FAILURES: &str =
    "Failures were found during deployment, please check the log for errors.";
pub const MSG_EXCEPTION: &str = "There was a problem with the deployment workflow, likely cause: the resource API is unavailable. Please contact an administrator.";
pub const MSG_CANCELLED: &str =
    "Deployment cancelled, resources deployed so far remain in place.";
pub const MSG_INTERNAL_FAULT: &str =
    "There was a problem with the deployment workflow, please contact an administrator.";

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The template could not be built.
    Validation,
    /// Resources depend on each other in a cycle.
    CyclicDependency,
    /// A batch had resources rejected by the API.
    Failures,
    /// A batch hit an infrastructure exception.
    ExceptionThrown,
    Cancelled,
    /// The orchestration itself broke.
    InternalFault,
}

impl FailureCause {
    pub fn message(self) -> &'static str {
        match self {
            FailureCause::Validation | FailureCause::CyclicDependency => MSG_VALIDATION,
            FailureCause::Failures => MSG_FAILURES,
            FailureCause::ExceptionThrown => MSG_EXCEPTION,
            FailureCause::Cancelled => MSG_CANCELLED,
            FailureCause::InternalFault => MSG_INTERNAL_FAULT,
        }
    }

    fn from_batch(status: BatchStatus) -> Option<Self> {
        match status {
            BatchStatus::Ok => None,
            BatchStatus::Failures => Some(FailureCause::Failures),
            BatchStatus::ExceptionThrown => Some(FailureCause::ExceptionThrown),
        }
    }
}

#[derive(Debug)]
pub struct JobCore {
    job_id: String,
    state: JobState,
    plan: Option<DeploymentPlan>,
    cursor: usize,
    totals: RequestCounters,
    failure: Option<FailureCause>,
    summary_taken: bool,
}

impl JobCore {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Building,
            plan: None,
            cursor: 0,
            totals: RequestCounters::default(),
            failure: None,
            summary_taken: false,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn totals(&self) -> RequestCounters {
        self.totals
    }

    pub fn failure(&self) -> Option<FailureCause> {
        self.failure
    }

    pub fn plan(&self) -> Option<&DeploymentPlan> {
        self.plan.as_ref()
    }

    /// Batches recorded so far.
    pub fn batches_done(&self) -> usize {
        self.cursor
    }

    pub fn deployment_failed(&self) -> bool {
        self.state == JobState::Failed
    }

    /// Template built: `Building -> Grouping`.
    pub fn begin_grouping(&mut self) -> bool {
        self.transition(JobState::Grouping)
    }

    /// Template rejected: `Building -> Failed`.
    pub fn fail_build(&mut self) -> bool {
        self.fail(FailureCause::Validation)
    }

    /// Plan resolved: `Grouping -> Deploying`.
    pub fn finish_grouping(&mut self, plan: DeploymentPlan) -> bool {
        if !self.transition(JobState::Deploying) {
            return false;
        }
        debug!(
            job_id = %self.job_id,
            groups = plan.groups().len(),
            batches = plan.batches().len(),
            "deployment plan accepted"
        );
        self.plan = Some(plan);
        self.cursor = 0;
        true
    }

    /// Resolution failed: `Grouping -> Failed`.
    pub fn fail_grouping(&mut self, cause: FailureCause) -> bool {
        if self.state != JobState::Grouping {
            warn!(job_id = %self.job_id, state = %self.state, "grouping failure outside Grouping ignored");
            return false;
        }
        self.fail(cause)
    }

    /// The batch to run next, if the job is still deploying and batches
    /// remain.
    pub fn next_batch(&self) -> Option<&Batch> {
        if self.state != JobState::Deploying {
            return None;
        }
        self.plan.as_ref()?.batches().get(self.cursor)
    }

    /// Fold a finished batch into the job. Counters are added whatever the
    /// status; a non-`Ok` status fails the job and stops deployment.
    pub fn record_batch(&mut self, status: BatchStatus, counters: RequestCounters) {
        if self.state != JobState::Deploying {
            warn!(job_id = %self.job_id, state = %self.state, "batch result outside Deploying ignored");
            return;
        }

        self.totals += counters;
        self.cursor += 1;

        if let Some(cause) = FailureCause::from_batch(status) {
            self.fail(cause);
        }
    }

    /// Stop before the next batch. Only meaningful while deploying.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.fail(FailureCause::Cancelled)
    }

    /// Every batch ran `Ok`: `Deploying -> Succeeded`.
    pub fn finish(&mut self) -> bool {
        if self.next_batch().is_some() {
            warn!(job_id = %self.job_id, "finish requested with batches left");
            return false;
        }
        self.transition(JobState::Succeeded)
    }

    /// Unexpected orchestration error from any non-terminal state.
    pub fn fail_internal(&mut self) -> bool {
        self.fail(FailureCause::InternalFault)
    }

    /// The terminal summary, handed out exactly once.
    pub fn take_summary(&mut self) -> Option<JobSummary> {
        if !self.state.is_terminal() || self.summary_taken {
            return None;
        }
        self.summary_taken = true;

        let message = match self.failure {
            Some(cause) => cause.message(),
            None => MSG_SUCCESS,
        };

        Some(JobSummary {
            job_id: self.job_id.clone(),
            status: self.state,
            total_requests: self.totals.total(),
            message: message.to_string(),
        })
    }

    fn fail(&mut self, cause: FailureCause) -> bool {
        if !self.transition(JobState::Failed) {
            return false;
        }
        self.failure = Some(cause);
        true
    }

    fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(job_id = %self.job_id, from = %self.state, to = %next, "invalid job transition ignored");
            return false;
        }
        debug!(job_id = %self.job_id, from = %self.state, to = %next, "job transition");
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{DependencyGroup, DeploymentPlan};
    use crate::template::Resource;

    fn plan(names: &[&[&str]], batch_size: usize) -> DeploymentPlan {
        let groups = names
            .iter()
            .enumerate()
            .map(|(index, members)| DependencyGroup {
                index,
                resources: members.iter().map(|n| Resource::new(*n, "t")).collect(),
            })
            .collect();
        DeploymentPlan::from_groups(groups, batch_size)
    }

    fn deploying(p: DeploymentPlan) -> JobCore {
        let mut core = JobCore::new("job");
        assert!(core.begin_grouping());
        assert!(core.finish_grouping(p));
        core
    }

    #[test]
    fn all_ok_batches_succeed_with_summed_counters() {
        let mut core = deploying(plan(&[&["a"], &["b"]], 5));

        while core.next_batch().is_some() {
            core.record_batch(BatchStatus::Ok, RequestCounters::new(2, 1));
        }
        assert!(core.finish());

        let summary = core.take_summary().unwrap();
        assert_eq!(summary.status, JobState::Succeeded);
        assert_eq!(summary.total_requests, 6);
        assert_eq!(summary.message, MSG_SUCCESS);
        assert!(core.take_summary().is_none());
    }

    #[test]
    fn failing_batch_stops_remaining_groups() {
        let mut core = deploying(plan(&[&["a", "b"], &["c"]], 1));

        core.record_batch(BatchStatus::Ok, RequestCounters::new(1, 0));
        core.record_batch(BatchStatus::Failures, RequestCounters::new(1, 0));

        assert!(core.next_batch().is_none());
        assert_eq!(core.batches_done(), 2);
        assert!(core.deployment_failed());
        let summary = core.take_summary().unwrap();
        assert_eq!(summary.message, MSG_FAILURES);
        assert_eq!(summary.total_requests, 2);
    }

    #[test]
    fn exception_uses_infrastructure_wording() {
        let mut core = deploying(plan(&[&["a"]], 5));
        core.record_batch(BatchStatus::ExceptionThrown, RequestCounters::default());
        assert_eq!(core.failure(), Some(FailureCause::ExceptionThrown));
        assert_eq!(core.take_summary().unwrap().message, MSG_EXCEPTION);
    }

    #[test]
    fn build_and_cycle_failures_are_validation() {
        let mut built = JobCore::new("j1");
        assert!(built.fail_build());
        assert_eq!(built.take_summary().unwrap().message, MSG_VALIDATION);

        let mut cyclic = JobCore::new("j2");
        cyclic.begin_grouping();
        assert!(cyclic.fail_grouping(FailureCause::CyclicDependency));
        let summary = cyclic.take_summary().unwrap();
        assert_eq!(summary.status, JobState::Failed);
        assert_eq!(summary.message, MSG_VALIDATION);
        assert_eq!(summary.total_requests, 0);
    }

    #[test]
    fn terminal_state_rejects_everything() {
        let mut core = deploying(plan(&[&["a"]], 5));
        core.record_batch(BatchStatus::Ok, RequestCounters::new(1, 1));
        assert!(core.finish());

        assert!(!core.cancel());
        assert!(!core.fail_internal());
        core.record_batch(BatchStatus::Failures, RequestCounters::new(9, 9));
        assert_eq!(core.state(), JobState::Succeeded);
        assert_eq!(core.totals().total(), 2);
    }

    #[test]
    fn cancel_keeps_counters_of_finished_batches() {
        let mut core = deploying(plan(&[&["a"], &["b"]], 5));
        core.record_batch(BatchStatus::Ok, RequestCounters::new(3, 0));
        assert!(core.cancel());
        assert!(core.next_batch().is_none());
        let summary = core.take_summary().unwrap();
        assert_eq!(summary.message, MSG_CANCELLED);
        assert_eq!(summary.total_requests, 3);
    }

    #[test]
    fn finish_refuses_with_batches_left() {
        let mut core = deploying(plan(&[&["a"], &["b"]], 5));
        core.record_batch(BatchStatus::Ok, RequestCounters::default());
        assert!(!core.finish());
        assert_eq!(core.state(), JobState::Deploying);
    }

    #[test]
    fn empty_plan_succeeds_immediately() {
        let mut core = deploying(plan(&[], 5));
        assert!(core.next_batch().is_none());
        assert!(core.finish());
        assert_eq!(core.take_summary().unwrap().total_requests, 0);
    }
}
