// src/dag/graph.rs

use std::collections::HashMap;

use crate::template::Resource;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Position of the resource in the template.
    position: usize,
    /// Direct dependencies: resources that must be deployed before this one.
    deps: Vec<String>,
    /// Direct dependents: resources that depend on this one.
    dependents: Vec<String>,
}

/// In-memory dependency graph keyed by resource name.
///
/// This only keeps adjacency information. Cycle detection and layering live
/// in [`crate::dag::order`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: HashMap<String, DagNode>,
    /// Resource names in template order.
    order: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph from a resource list.
    ///
    /// Dependencies naming resources outside the list are kept in `deps` but
    /// produce no dependent edge; callers check them with
    /// [`DependencyGraph::unknown_dependencies`].
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut nodes: HashMap<String, DagNode> = HashMap::new();
        let mut order = Vec::with_capacity(resources.len());

        // First pass: create nodes with their dependency lists.
        for (position, resource) in resources.iter().enumerate() {
            order.push(resource.name.clone());
            nodes.insert(
                resource.name.clone(),
                DagNode {
                    position,
                    deps: resource.depends_on.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        for resource in resources {
            for dep in &resource.depends_on {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(resource.name.clone());
                }
            }
        }

        Self { nodes, order }
    }

    /// All resource names, in template order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Template position of a resource.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.nodes.get(name).map(|n| n.position)
    }

    /// Immediate dependencies of a resource (its `dependsOn`).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a resource.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `(resource, dependency)` pairs whose dependency is not in the graph.
    pub fn unknown_dependencies(&self) -> Vec<(&str, &str)> {
        self.resources()
            .flat_map(|name| {
                self.dependencies_of(name)
                    .iter()
                    .filter(|dep| !self.contains(dep))
                    .map(move |dep| (name, dep.as_str()))
            })
            .collect()
    }
}
