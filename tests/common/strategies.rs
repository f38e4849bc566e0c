use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

/// Strategy for generating valid worker names
pub fn worker_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_filter("YAML keywords are not plain strings", |name| {
        !matches!(name.as_str(), "null" | "true" | "false")
    })
}

/// Strategy for generating 1..=5 distinct worker names
pub fn worker_names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(worker_name_strategy(), 1..=5)
        .prop_map(|names| names.into_iter().collect())
}

/// Strategy for generating workflow type names
pub fn workflow_type_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,15}Workflow"
}

/// Worker names plus workflows, each declaring a (possibly empty) subset of them
pub fn affinity_strategy() -> impl Strategy<Value = (Vec<String>, Vec<(String, BTreeSet<String>)>)> {
    worker_names_strategy().prop_flat_map(|workers| {
        let subset = prop::sample::subsequence(workers.clone(), 0..=workers.len())
            .prop_map(|names| names.into_iter().collect::<BTreeSet<String>>());
        let workflows = prop::collection::btree_map(workflow_type_strategy(), subset, 0..8)
            .prop_map(|map| map.into_iter().collect::<Vec<_>>());
        (Just(workers), workflows)
    })
}

/// Strategy for generating interval strings with the duration they denote
pub fn interval_strategy() -> impl Strategy<Value = (String, Duration)> {
    (1u64..1000, prop_oneof![
        Just(("milliseconds", 1u64)),
        Just(("seconds", 1_000)),
        Just(("minutes", 60_000)),
        Just(("hours", 3_600_000)),
    ])
        .prop_map(|(value, (unit, millis))| {
            (format!("{value} {unit}"), Duration::from_millis(value * millis))
        })
}

/// Strategy for generating finalizer lists with per-entry failure flags
pub fn finalizer_plan_strategy() -> impl Strategy<Value = Vec<(String, bool)>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<bool>(), 1..6)
        .prop_map(|map| {
            map.into_iter()
                .map(|(name, fail)| (format!("app.{name}.finalizer"), fail))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}
