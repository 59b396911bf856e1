// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the spec suite.

use klr_core::{LifecycleState, ZooidRecord};
use klr_registry::Registry;

pub const NOW: f64 = 1_762_484_000.0;

/// A registry with one `latency_monitoring` niche holding one ACTIVE
/// zooid and two DORMANT candidates — the canonical probation fixture.
pub fn latency_colony() -> Registry {
    let mut registry = Registry::empty();

    let mut active = ZooidRecord::new(
        "existing_active_001",
        "latency_monitoring",
        "prod_guard",
        "sha256:ghi789",
        NOW - 10_000.0,
    );
    active.lifecycle_state = LifecycleState::Active;
    active.promoted_ts = Some(NOW - 9_000.0);
    registry.add_zooid(active);

    registry.add_zooid(ZooidRecord::new(
        "lat_mon_001",
        "latency_monitoring",
        "prod_guard",
        "sha256:abc123",
        NOW - 1_000.0,
    ));
    registry.add_zooid(ZooidRecord::new(
        "lat_mon_002",
        "latency_monitoring",
        "prod_guard",
        "sha256:def456",
        NOW - 2_000.0,
    ));

    registry.version = 1;
    registry
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
