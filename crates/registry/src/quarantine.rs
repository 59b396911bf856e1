// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The quarantine monitor algorithm.
//!
//! Demotes ACTIVE zooids on failure bursts in the observation stream.
//! Pure over its inputs: the caller supplies the rows, the clock value,
//! and the `stop_service` side effect, so re-running with the same rows
//! is harmless — demoted zooids are no longer ACTIVE and freshly
//! re-activated ones are protected by their cooldown.

use klr_core::{LifecycleState, Observation, ServiceAction, StateChangeEvent};

use crate::Registry;

/// Quarantine thresholds.
#[derive(Debug, Clone)]
pub struct QuarantineConfig {
    /// Failures within the window that trip a demotion.
    pub n_failures: u32,
    /// Window length in seconds.
    pub window_sec: u64,
    /// `demotions + 1 >= ceiling` retires instead of demoting.
    pub demotion_ceiling: u32,
    /// Cooldown after the first demotion; doubles per prior demotion.
    pub cooldown_base_sec: f64,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            n_failures: 3,
            window_sec: 900,
            demotion_ceiling: 2,
            cooldown_base_sec: 3600.0,
        }
    }
}

/// Sweep ACTIVE zooids against a slice of ledger rows.
///
/// Rows without an `ok` field count as passes. Returns the names newly
/// demoted (to DORMANT or RETIRED); `stop_service` runs exactly once
/// per demotion.
pub fn check_quarantine(
    registry: &mut Registry,
    rows: &[Observation],
    now: f64,
    config: &QuarantineConfig,
    stop_service: &mut dyn FnMut(&str),
    on_event: &mut dyn FnMut(StateChangeEvent),
) -> Vec<String> {
    let cutoff = now - config.window_sec as f64;

    let active: Vec<String> = registry
        .zooids
        .values()
        .filter(|z| z.lifecycle_state == LifecycleState::Active)
        .map(|z| z.name.clone())
        .collect();

    let mut demoted = Vec::new();

    for name in active {
        let failures = rows
            .iter()
            .filter(|row| row.zooid == name && row.ts >= cutoff && row.ok == Some(false))
            .count() as u32;

        if failures < config.n_failures {
            continue;
        }

        let Some(record) = registry.zooids.get(&name) else {
            continue;
        };
        if now < record.policy.cooldown_until_ts {
            continue;
        }

        let genome_hash = record.genome_hash.clone();
        let prior_demotions = record.demotions;
        let retiring = prior_demotions + 1 >= config.demotion_ceiling;

        let target = if retiring {
            LifecycleState::Retired
        } else {
            LifecycleState::Dormant
        };
        let Some(from) = registry.relocate(&name, target) else {
            continue;
        };

        let new_demotions = prior_demotions + 1;
        let cooldown_until_ts =
            now + config.cooldown_base_sec * 2f64.powi(prior_demotions.min(16) as i32);

        if let Some(record) = registry.zooids.get_mut(&name) {
            record.demotions = new_demotions;
            if !retiring {
                record.policy.cooldown_until_ts = cooldown_until_ts;
            }
        }

        stop_service(&name);

        let reason = if retiring {
            "demotion_ceiling"
        } else {
            "prod_guard_trip"
        };
        let mut event = StateChangeEvent::new(name.clone(), from, target, reason, genome_hash, now)
            .with_service_action(ServiceAction::SystemdStop)
            .with_failure_burst(failures, config.window_sec, new_demotions);
        if !retiring {
            event = event.with_cooldown(cooldown_until_ts);
        }
        on_event(event);

        demoted.push(name);
    }

    demoted
}

#[cfg(test)]
#[path = "quarantine_tests.rs"]
mod tests;
