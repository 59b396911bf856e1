// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A PHASE batch enrolls dormant zooids, exactly once.

use crate::prelude::{latency_colony, names, NOW};
use klr_core::{LifecycleState, ServiceAction, StateChangeEvent};
use klr_registry::{reconcile, start_probation, RegistryStore};

const BATCH_ID: &str = "2025-11-07T03:10Z-LIGHT";

#[test]
fn probation_batch_end_to_end() {
    let mut registry = latency_colony();
    let mut events: Vec<StateChangeEvent> = Vec::new();

    let promoted = start_probation(
        &mut registry,
        &names(&["lat_mon_001", "lat_mon_002"]),
        BATCH_ID,
        NOW,
        &mut |e| events.push(e),
    );

    assert_eq!(promoted, names(&["lat_mon_001", "lat_mon_002"]));
    for name in ["lat_mon_001", "lat_mon_002"] {
        assert_eq!(
            registry.zooids[name].lifecycle_state,
            LifecycleState::Probation,
        );
        assert_eq!(registry.zooids[name].phase.batches, vec![BATCH_ID.to_string()]);
    }

    let niche = &registry.niches["latency_monitoring"];
    assert!(niche.dormant.is_empty());
    assert_eq!(niche.probation, names(&["lat_mon_001", "lat_mon_002"]));
    assert_eq!(niche.active, names(&["existing_active_001"]));

    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.from, LifecycleState::Dormant);
        assert_eq!(event.to, LifecycleState::Probation);
        assert_eq!(event.reason, format!("phase_batch:{BATCH_ID}"));
        assert_eq!(event.service_action, ServiceAction::Noop);
    }

    // Second call with the same arguments: no events, no changes.
    events.clear();
    let again = start_probation(
        &mut registry,
        &names(&["lat_mon_001", "lat_mon_002"]),
        BATCH_ID,
        NOW + 100.0,
        &mut |e| events.push(e),
    );
    assert!(again.is_empty());
    assert!(events.is_empty());
    assert_eq!(
        registry.zooids["lat_mon_001"].phase.batches,
        vec![BATCH_ID.to_string()],
    );

    // The enrolled registry survives a persistence round trip intact.
    let dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::new(dir.path().join("niche_map.json"));
    store.snapshot_then_atomic_write(&mut registry).unwrap();
    let mut reloaded = store.load().unwrap();
    assert_eq!(reloaded, registry);
    assert!(reconcile(&mut reloaded).is_empty(), "persisted state is consistent");
}
