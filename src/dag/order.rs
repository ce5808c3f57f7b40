// src/dag/order.rs

//! Deployment order resolution.
//!
//! Resources are layered breadth-first: group 0 holds every resource without
//! dependencies, group `i` every resource whose last dependency sits in group
//! `i - 1`. Each resource therefore lands in the earliest group its
//! dependencies allow, which maximises what can run side by side.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::errors::{DeployError, Result, ValidationError};
use crate::template::Resource;

/// One layer of mutually independent resources.
///
/// Every dependency of a member lives in a group with a smaller `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGroup {
    pub index: usize,
    /// Members in template order.
    pub resources: Vec<Resource>,
}

impl DependencyGroup {
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Partition `resources` into dependency groups.
///
/// Fails with [`DeployError::CyclicDependency`] if some resources can never
/// be assigned, and with [`DeployError::UnknownDependency`] if a
/// `dependsOn` entry names a resource outside the set. Empty input yields no
/// groups.
pub fn resolve(resources: &[Resource]) -> Result<Vec<DependencyGroup>> {
    ensure_unique_names(resources)?;

    let graph = DependencyGraph::from_resources(resources);

    if let Some((resource, dependency)) = graph.unknown_dependencies().first() {
        return Err(DeployError::UnknownDependency {
            resource: resource.to_string(),
            dependency: dependency.to_string(),
        });
    }

    let by_name: HashMap<&str, &Resource> =
        resources.iter().map(|r| (r.name.as_str(), r)).collect();

    let mut in_degree: HashMap<&str, usize> = graph
        .resources()
        .map(|name| (name, graph.dependencies_of(name).len()))
        .collect();

    let mut current: Vec<&str> = graph
        .resources()
        .filter(|name| in_degree.get(name).copied() == Some(0))
        .collect();

    let mut groups: Vec<DependencyGroup> = Vec::new();
    let mut assigned: HashSet<&str> = HashSet::new();

    while !current.is_empty() {
        let mut next: Vec<&str> = Vec::new();

        for name in &current {
            for dependent in graph.dependents_of(name) {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(dependent.as_str());
                    }
                }
            }
        }

        let index = groups.len();
        let members: Vec<Resource> = current
            .iter()
            .filter_map(|name| by_name.get(name).map(|r| (*r).clone()))
            .collect();

        debug!(group = index, resources = ?current, "dependency group resolved");

        assigned.extend(current.iter().copied());
        groups.push(DependencyGroup {
            index,
            resources: members,
        });

        next.sort_by_key(|name| graph.position_of(name));
        current = next;
    }

    if assigned.len() < graph.len() {
        let unassigned: Vec<&str> = graph
            .resources()
            .filter(|name| !assigned.contains(name))
            .collect();
        let description = describe_cycles(&graph, &unassigned);
        warn!(unassigned = ?unassigned, "dependency cycle detected");
        return Err(DeployError::CyclicDependency(description));
    }

    Ok(groups)
}

fn ensure_unique_names(resources: &[Resource]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for resource in resources {
        if !seen.insert(resource.name.as_str()) {
            return Err(DeployError::Validation(ValidationError::with_code(
                "DuplicateResource",
                format!("resource name '{}' is used more than once", resource.name),
            )));
        }
    }
    Ok(())
}

/// Name the strongly connected components among the unassigned resources.
///
/// Resources that merely depend on a cycle are unassigned too, but are not
/// part of any component with more than one member.
fn describe_cycles(graph: &DependencyGraph, unassigned: &[&str]) -> String {
    let members: HashSet<&str> = unassigned.iter().copied().collect();

    // Edge direction: dep -> resource.
    let mut sub: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in unassigned {
        sub.add_node(*name);
    }
    for name in unassigned {
        for dep in graph.dependencies_of(name) {
            if members.contains(dep.as_str()) {
                sub.add_edge(dep.as_str(), *name, ());
            }
        }
    }

    let mut cycles: Vec<Vec<&str>> = tarjan_scc(&sub)
        .into_iter()
        .filter(|scc| scc.len() > 1 || sub.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort_by_key(|name| graph.position_of(name));
            scc
        })
        .collect();
    cycles.sort_by_key(|scc| scc.first().and_then(|name| graph.position_of(name)));

    if cycles.is_empty() {
        return format!("unable to order resources: {}", unassigned.join(", "));
    }

    let parts: Vec<String> = cycles
        .iter()
        .map(|scc| format!("cycle detected involving resources {}", quote_all(scc)))
        .collect();
    parts.join("; ")
}

fn quote_all(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(name: &str, deps: &[&str]) -> Resource {
        let mut r = Resource::new(name, "test/type");
        r.depends_on = deps.iter().map(|d| d.to_string()).collect();
        r
    }

    #[test]
    fn diamond_is_layered_at_earliest_positions() {
        let resources = vec![
            res("d", &["b", "c"]),
            res("b", &["a"]),
            res("a", &[]),
            res("c", &["a"]),
            res("e", &[]),
        ];
        let groups = resolve(&resources).unwrap();
        let names: Vec<Vec<&str>> = groups.iter().map(|g| g.names()).collect();
        assert_eq!(names, vec![vec!["a", "e"], vec!["b", "c"], vec!["d"]]);
    }

    #[test]
    fn cycle_message_names_members_only() {
        let resources = vec![res("x", &["y"]), res("y", &["x"]), res("z", &["x"])];
        match resolve(&resources) {
            Err(DeployError::CyclicDependency(msg)) => {
                assert!(msg.contains("'x'"));
                assert!(msg.contains("'y'"));
                assert!(!msg.contains("'z'"));
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let resources = vec![res("a", &["ghost"])];
        match resolve(&resources) {
            Err(DeployError::UnknownDependency { resource, dependency }) => {
                assert_eq!(resource, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected UnknownDependency, got {other:?}"),
        }
    }
}
