// src/engine/mod.rs

//! Job orchestration engine.
//!
//! A job moves `Building -> Grouping -> Deploying -> (Succeeded | Failed)`
//! and always ends with exactly one summary entry in its log.
//!
//! The pure state machine lives in [`core`]; the async shell that builds,
//! resolves and deploys is [`runtime`]; [`job`] starts jobs and hands out
//! the caller-side [`JobHandle`].

pub mod core;
pub mod job;
pub mod runtime;

pub use self::core::{FailureCause, JobCore};
pub use job::{CancelHandle, JobHandle, JobOptions, JobServices, new_job_id, start_job};
pub use runtime::JobRuntime;
