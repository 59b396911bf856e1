// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure bursts demote; the demotion ceiling retires.

use crate::prelude::{latency_colony, NOW};
use klr_core::{LifecycleState, Observation, StateChangeEvent};
use klr_registry::{check_quarantine, promote_active, start_probation, QuarantineConfig};

fn row(zooid: &str, ts: f64, ok: bool) -> Observation {
    Observation::new(ts, "inc-spec", zooid, "latency_monitoring", "prod_guard").with_outcome(ok)
}

fn config() -> QuarantineConfig {
    QuarantineConfig {
        n_failures: 3,
        window_sec: 900,
        demotion_ceiling: 2,
        cooldown_base_sec: 3600.0,
    }
}

/// Promote the fixture's dormant candidates so they are ACTIVE.
fn activated_colony() -> klr_registry::Registry {
    let mut registry = latency_colony();
    let names = vec!["lat_mon_001".to_string(), "lat_mon_002".to_string()];
    start_probation(&mut registry, &names, "batch", NOW - 500.0, &mut |_| {});
    promote_active(&mut registry, &names, NOW - 400.0, &mut |_| {});
    registry
}

#[test]
fn quarantine_trip_then_idempotent_rerun() {
    let mut registry = activated_colony();
    let rows = vec![
        row("lat_mon_001", NOW - 600.0, false),
        row("lat_mon_001", NOW - 450.0, false),
        row("lat_mon_001", NOW - 150.0, false),
        row("lat_mon_002", NOW - 200.0, false),
    ];

    let mut stops: Vec<String> = Vec::new();
    let mut events: Vec<StateChangeEvent> = Vec::new();
    let demoted = check_quarantine(
        &mut registry,
        &rows,
        NOW,
        &config(),
        &mut |name| stops.push(name.to_string()),
        &mut |e| events.push(e),
    );

    assert_eq!(demoted, vec!["lat_mon_001".to_string()]);
    let zooid = &registry.zooids["lat_mon_001"];
    assert_eq!(zooid.lifecycle_state, LifecycleState::Dormant);
    assert_eq!(zooid.demotions, 1);
    assert!(zooid.policy.cooldown_until_ts > NOW);
    assert_eq!(stops, vec!["lat_mon_001".to_string()]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].failures_in_window, Some(3));
    assert_eq!(events[0].reason, "prod_guard_trip");

    // Re-running with the same rows demotes no one and stops nothing.
    stops.clear();
    events.clear();
    let rerun = check_quarantine(
        &mut registry,
        &rows,
        NOW + 10.0,
        &config(),
        &mut |name| stops.push(name.to_string()),
        &mut |e| events.push(e),
    );
    assert!(rerun.is_empty());
    assert!(stops.is_empty());
    assert!(events.is_empty());
}

#[test]
fn demotion_ceiling_retires_after_cooldown() {
    let mut registry = activated_colony();
    {
        let zooid = registry.zooids.get_mut("lat_mon_001").unwrap();
        zooid.demotions = 1;
        zooid.policy.cooldown_until_ts = NOW - 100.0;
    }

    let rows = vec![
        row("lat_mon_001", NOW + 100.0, false),
        row("lat_mon_001", NOW + 150.0, false),
        row("lat_mon_001", NOW + 200.0, false),
    ];

    let mut events: Vec<StateChangeEvent> = Vec::new();
    let demoted = check_quarantine(
        &mut registry,
        &rows,
        NOW + 300.0,
        &config(),
        &mut |_| {},
        &mut |e| events.push(e),
    );

    assert_eq!(demoted, vec!["lat_mon_001".to_string()]);
    assert_eq!(
        registry.zooids["lat_mon_001"].lifecycle_state,
        LifecycleState::Retired,
    );
    assert!(registry.niches["latency_monitoring"]
        .retired
        .contains(&"lat_mon_001".to_string()));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, "demotion_ceiling");
    assert_eq!(events[0].to, LifecycleState::Retired);
}
