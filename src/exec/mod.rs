// src/exec/mod.rs

//! Resource deployment layer.
//!
//! - [`backend`] provides the `ResourceApi` trait the executor talks to,
//!   plus the per-job `DeployContext`.
//! - [`http`] is the production `ResourceApi` built on `reqwest`.
//! - [`executor`] runs one batch with a task per resource and classifies
//!   the batch outcome.

pub mod backend;
pub mod executor;
pub mod http;

pub use backend::{DeployContext, ResourceApi, ResourceOutcome};
pub use executor::{BatchExecutor, DeployGroupData};
pub use http::HttpResourceApi;
