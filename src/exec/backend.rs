// src/exec/backend.rs

//! Pluggable resource API abstraction.
//!
//! The batch executor talks to a `ResourceApi` instead of an HTTP client.
//! Production uses [`crate::exec::http::HttpResourceApi`]; tests provide a
//! scripted fake that records which resources were deployed.

use std::fmt;

use crate::template::Resource;
use crate::types::{BoxFuture, RequestCounters};

/// Per-job data handed to every `deploy` call.
#[derive(Clone, Default)]
pub struct DeployContext {
    pub job_id: String,
    /// Bearer token for the resource API, if one was acquired.
    pub access_token: Option<String>,
}

impl DeployContext {
    pub fn new(job_id: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            job_id: job_id.into(),
            access_token,
        }
    }
}

impl fmt::Debug for DeployContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployContext")
            .field("job_id", &self.job_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outcome of deploying one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// Deployed; carries the usage counters the API reported.
    Success(RequestCounters),
    /// The API rejected the resource.
    ApplicationFailure(String),
    /// The call itself broke (API unreachable, server fault).
    InfrastructureException(String),
}

/// Trait abstracting how a single resource reaches the remote API.
///
/// Implementations must tolerate concurrent calls: every resource of a
/// batch is deployed at the same time. Errors are part of the outcome, so
/// `deploy` itself never fails.
pub trait ResourceApi: Send + Sync {
    fn deploy<'a>(
        &'a self,
        resource: &'a Resource,
        context: &'a DeployContext,
    ) -> BoxFuture<'a, ResourceOutcome>;
}
