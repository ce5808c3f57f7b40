use std::collections::{HashMap, HashSet};

use drmdeploy::dag::{DeploymentPlan, plan, resolve};
use drmdeploy::errors::DeployError;
use drmdeploy::template::{Resource, Template};
use drmdeploy_test_utils::builders::{ResourceBuilder, resources};
use proptest::prelude::*;

// Strategy to generate an acyclic resource list.
// Resource N may only depend on resources 0..N-1, so no cycle can form.
fn acyclic_resources_strategy(max_resources: usize) -> impl Strategy<Value = Vec<Resource>> {
    (1..=max_resources).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw_deps| {
                raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, potential)| {
                        let deps: HashSet<String> = if i == 0 {
                            HashSet::new()
                        } else {
                            potential.iter().map(|d| format!("r{}", d % i)).collect()
                        };
                        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                        ResourceBuilder::new(&format!("r{i}")).depends_on(&deps).build()
                    })
                    .collect()
            },
        )
    })
}

fn group_of(groups: &[drmdeploy::dag::DependencyGroup]) -> HashMap<String, usize> {
    groups
        .iter()
        .flat_map(|g| g.resources.iter().map(move |r| (r.name.clone(), g.index)))
        .collect()
}

proptest! {
    #[test]
    fn layering_respects_every_dependency(res in acyclic_resources_strategy(25)) {
        let groups = resolve(&res).unwrap();
        let placed = group_of(&groups);

        // Every resource exactly once.
        let total: usize = groups.iter().map(|g| g.len()).sum();
        prop_assert_eq!(total, res.len());
        prop_assert_eq!(placed.len(), res.len());

        for r in &res {
            let own = placed[&r.name];
            for dep in &r.depends_on {
                prop_assert!(placed[dep] < own, "{} in group {} depends on {} in group {}", r.name, own, dep, placed[dep]);
            }
            // Earliest possible group.
            let expected = r.depends_on.iter().map(|d| placed[d] + 1).max().unwrap_or(0);
            prop_assert_eq!(own, expected);
        }

        for (i, g) in groups.iter().enumerate() {
            prop_assert_eq!(g.index, i);
            prop_assert!(!g.is_empty());
        }
    }

    #[test]
    fn batches_partition_groups(res in acyclic_resources_strategy(25), max in 0usize..8) {
        let groups = resolve(&res).unwrap();
        let cap = max.max(1);

        for group in &groups {
            let batches = plan(group, max);
            let flattened: Vec<&str> = batches.iter().flat_map(|b| b.names()).collect();
            prop_assert_eq!(flattened, group.names());
            for (i, b) in batches.iter().enumerate() {
                prop_assert!(!b.is_empty());
                prop_assert!(b.len() <= cap);
                prop_assert_eq!(b.index, i);
                prop_assert_eq!(b.group_index, group.index);
            }
        }
    }

    #[test]
    fn rings_are_reported_as_cycles(ring in 2usize..6, extra in 0usize..5) {
        let mut res: Vec<Resource> = (0..extra)
            .map(|i| ResourceBuilder::new(&format!("free{i}")).build())
            .collect();
        for i in 0..ring {
            let next = format!("ring{}", (i + 1) % ring);
            res.push(ResourceBuilder::new(&format!("ring{i}")).depends_on(&[next.as_str()]).build());
        }

        match resolve(&res) {
            Err(DeployError::CyclicDependency(msg)) => {
                for i in 0..ring {
                    let name = format!("ring{i}");
                    prop_assert!(msg.contains(&name), "'{}' missing from '{}'", name, msg);
                }
            }
            other => prop_assert!(false, "expected cycle error, got {:?}", other),
        }
    }
}

#[test]
fn chain_and_root_make_two_groups() {
    let groups = resolve(&resources(&[("A", &[]), ("B", &["A"])])).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].names(), vec!["A"]);
    assert_eq!(groups[1].names(), vec!["B"]);
}

#[test]
fn diamond_keeps_template_order_within_groups() {
    let groups = resolve(&resources(&[
        ("db", &[]),
        ("cache", &[]),
        ("web", &["db", "cache"]),
        ("api", &["db"]),
        ("gateway", &["web", "api"]),
    ]))
    .unwrap();

    let names: Vec<Vec<&str>> = groups.iter().map(|g| g.names()).collect();
    assert_eq!(
        names,
        vec![vec!["db", "cache"], vec!["web", "api"], vec!["gateway"]]
    );
}

#[test]
fn empty_input_has_no_groups() {
    assert!(resolve(&[]).unwrap().is_empty());
    let plan = DeploymentPlan::build(&Template::new(Vec::new()), 5).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.resource_count(), 0);
}

#[test]
fn mutual_dependency_names_both_resources() {
    let err = resolve(&resources(&[("X", &["Y"]), ("Y", &["X"])])).unwrap_err();
    match err {
        DeployError::CyclicDependency(msg) => {
            assert!(msg.contains("'X'"));
            assert!(msg.contains("'Y'"));
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = resolve(&resources(&[("A", &["ghost"])])).unwrap_err();
    assert!(matches!(
        err,
        DeployError::UnknownDependency { ref resource, ref dependency }
            if resource == "A" && dependency == "ghost"
    ));
}

#[test]
fn seven_wide_group_with_cap_three() {
    let wide: Vec<Resource> = (0..7)
        .map(|i| ResourceBuilder::new(&format!("w{i}")).build())
        .collect();
    let plan = DeploymentPlan::build(&Template::new(wide), 3).unwrap();

    let sizes: Vec<usize> = plan.batches().iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(plan.groups().len(), 1);
}
