// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use klr_core::ZooidRecord;

fn zooid(name: &str, state: LifecycleState) -> ZooidRecord {
    let mut z = ZooidRecord::new(
        name,
        "latency_monitoring",
        "prod_guard",
        format!("sha256:{name}"),
        100.0,
    );
    z.lifecycle_state = state;
    z
}

use klr_core::LifecycleState;

#[test]
fn empty_registry_is_version_zero() {
    let registry = Registry::empty();
    assert_eq!(registry.version, 0);
    assert!(registry.niches.is_empty());
    assert!(registry.zooids.is_empty());
    assert!(registry.genomes.is_empty());
}

#[test]
fn add_zooid_indexes_and_binds_genome() {
    let mut registry = Registry::empty();
    registry.add_zooid(zooid("z1", LifecycleState::Dormant));

    assert_eq!(
        registry.niches["latency_monitoring"].dormant,
        vec!["z1".to_string()]
    );
    assert_eq!(registry.genomes["sha256:z1"], "z1");
}

#[test]
fn relocate_moves_between_lists() {
    let mut registry = Registry::empty();
    registry.add_zooid(zooid("z1", LifecycleState::Dormant));

    let from = registry.relocate("z1", LifecycleState::Probation);
    assert_eq!(from, Some(LifecycleState::Dormant));

    let index = &registry.niches["latency_monitoring"];
    assert!(index.dormant.is_empty());
    assert_eq!(index.probation, vec!["z1".to_string()]);
    assert_eq!(
        registry.zooids["z1"].lifecycle_state,
        LifecycleState::Probation
    );
}

#[test]
fn relocate_to_current_state_is_noop() {
    let mut registry = Registry::empty();
    registry.add_zooid(zooid("z1", LifecycleState::Active));

    assert_eq!(registry.relocate("z1", LifecycleState::Active), None);
    assert_eq!(registry.relocate("ghost", LifecycleState::Active), None);
}

#[test]
fn remove_everywhere_clears_duplicates() {
    let mut index = NicheIndex::default();
    index.active.push("z".to_string());
    index.active.push("z".to_string());
    index.dormant.push("z".to_string());

    assert_eq!(index.remove_everywhere("z"), 3);
    assert!(index.states_holding("z").is_empty());
}
