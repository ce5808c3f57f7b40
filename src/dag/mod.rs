// src/dag/mod.rs

//! Dependency ordering and batch planning.
//!
//! - [`graph`] holds the adjacency view of a template's resources.
//! - [`order`] layers resources into dependency groups.
//! - [`batch`] cuts groups into bounded batches.
//!
//! [`DeploymentPlan`] ties the three together for one template.

pub mod batch;
pub mod graph;
pub mod order;

pub use batch::{Batch, plan};
pub use graph::DependencyGraph;
pub use order::{DependencyGroup, resolve};

use crate::errors::Result;
use crate::template::Template;

/// Groups and batches for one template, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    groups: Vec<DependencyGroup>,
    batches: Vec<Batch>,
    batch_size: usize,
}

impl DeploymentPlan {
    /// Resolve the deployment order of `template` and batch every group.
    pub fn build(template: &Template, batch_size: usize) -> Result<Self> {
        let groups = resolve(&template.resources)?;
        Ok(Self::from_groups(groups, batch_size))
    }

    pub fn from_groups(groups: Vec<DependencyGroup>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let batches = groups
            .iter()
            .flat_map(|group| plan(group, batch_size))
            .collect();

        Self {
            groups,
            batches,
            batch_size,
        }
    }

    pub fn groups(&self) -> &[DependencyGroup] {
        &self.groups
    }

    /// All batches, group by group, in the order they are executed.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn resource_count(&self) -> usize {
        self.groups.iter().map(DependencyGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
