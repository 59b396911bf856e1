// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure lifecycle transitions.
//!
//! Every function mutates the registry document, emits exactly one
//! event per transition through the caller's callback, and is a no-op
//! on zooids already in the target state. No I/O happens here.

use klr_core::{LifecycleState, StateChangeEvent};

use crate::Registry;

/// Enroll DORMANT zooids in a PHASE batch: DORMANT → PROBATION.
///
/// Appends `batch_id` to `phase.batches` at most once and emits
/// `zooid_state_change` with reason `phase_batch:<id>`. Zooids already
/// in PROBATION (or not DORMANT, or unknown) are skipped silently.
/// Returns the names actually transitioned.
pub fn start_probation(
    registry: &mut Registry,
    names: &[String],
    batch_id: &str,
    now: f64,
    on_event: &mut dyn FnMut(StateChangeEvent),
) -> Vec<String> {
    let mut promoted = Vec::new();

    for name in names {
        let Some(record) = registry.zooids.get(name) else {
            continue;
        };
        if record.lifecycle_state != LifecycleState::Dormant {
            continue;
        }
        let genome_hash = record.genome_hash.clone();

        let Some(from) = registry.relocate(name, LifecycleState::Probation) else {
            continue;
        };

        if let Some(record) = registry.zooids.get_mut(name) {
            if !record.phase.batches.iter().any(|b| b == batch_id) {
                record.phase.batches.push(batch_id.to_string());
            }
        }

        on_event(StateChangeEvent::new(
            name.clone(),
            from,
            LifecycleState::Probation,
            format!("phase_batch:{batch_id}"),
            genome_hash,
            now,
        ));
        promoted.push(name.clone());
    }

    promoted
}

/// Promote PROBATION zooids that survived evidence aggregation:
/// PROBATION → ACTIVE. Sets `promoted_ts`. Idempotent.
pub fn promote_active(
    registry: &mut Registry,
    names: &[String],
    now: f64,
    on_event: &mut dyn FnMut(StateChangeEvent),
) -> Vec<String> {
    let mut promoted = Vec::new();

    for name in names {
        let Some(record) = registry.zooids.get(name) else {
            continue;
        };
        if record.lifecycle_state != LifecycleState::Probation {
            continue;
        }
        let genome_hash = record.genome_hash.clone();

        let Some(from) = registry.relocate(name, LifecycleState::Active) else {
            continue;
        };

        if let Some(record) = registry.zooids.get_mut(name) {
            record.promoted_ts = Some(now);
        }

        on_event(StateChangeEvent::new(
            name.clone(),
            from,
            LifecycleState::Active,
            "phase_selection",
            genome_hash,
            now,
        ));
        promoted.push(name.clone());
    }

    promoted
}

/// Explicitly retire zooids from any state. Terminal; idempotent.
pub fn retire(
    registry: &mut Registry,
    names: &[String],
    reason: &str,
    now: f64,
    on_event: &mut dyn FnMut(StateChangeEvent),
) -> Vec<String> {
    let mut retired = Vec::new();

    for name in names {
        let Some(record) = registry.zooids.get(name) else {
            continue;
        };
        let genome_hash = record.genome_hash.clone();

        let Some(from) = registry.relocate(name, LifecycleState::Retired) else {
            continue;
        };

        on_event(StateChangeEvent::new(
            name.clone(),
            from,
            LifecycleState::Retired,
            reason,
            genome_hash,
            now,
        ));
        retired.push(name.clone());
    }

    retired
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
