use std::fmt;
use std::future::Future;
use std::ops::AddAssign;
use std::pin::Pin;

/// Canonical resource name type used throughout the crate.
pub type ResourceName = String;

/// Boxed, sendable future returned by the collaborator traits
/// (`TemplateBuilder`, `ResourceApi`, `CredentialProvider`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle of a deployment job.
///
/// `Building -> Grouping -> Deploying -> (Succeeded | Failed)`. Any
/// non-terminal state may also move straight to `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobState {
    #[default]
    Building,
    Grouping,
    Deploying,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether `self -> next` is a legal edge of the job state machine.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Building, Grouping) | (Grouping, Deploying) | (Deploying, Succeeded) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Building => "Building",
            JobState::Grouping => "Grouping",
            JobState::Deploying => "Deploying",
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Classification of one executed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every resource in the batch deployed.
    Ok,
    /// At least one resource was rejected by the remote API.
    Failures,
    /// Dispatch itself broke (API unreachable, task panicked).
    ExceptionThrown,
}

/// Usage counters reported by the remote API for deployed resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounters {
    pub requests: u64,
    pub internal_requests: u64,
}

impl RequestCounters {
    pub fn new(requests: u64, internal_requests: u64) -> Self {
        Self {
            requests,
            internal_requests,
        }
    }

    /// Total remote-request count (external + internal).
    pub fn total(&self) -> u64 {
        self.requests + self.internal_requests
    }
}

impl AddAssign for RequestCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.requests += rhs.requests;
        self.internal_requests += rhs.internal_requests;
    }
}
