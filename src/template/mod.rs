// src/template/mod.rs

//! Templates: the resource model, request assembly, and the build stage.
//!
//! - [`model`] holds `Resource`, `Template` and the request wire form.
//! - [`request`] assembles the request body from files and overrides.
//! - [`builder`] defines the `TemplateBuilder` contract and its default
//!   implementation.

pub mod builder;
pub mod model;
pub mod request;

pub use builder::{CompiledTemplateBuilder, TemplateBuilder};
pub use model::{AzureProfile, DeployRequest, ParameterValue, Resource, Template};
