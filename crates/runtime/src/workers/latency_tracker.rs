// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Latency monitoring zooid.
//!
//! Collects p95 readings per incident and emits one aggregated
//! observation (median/mean/max) once enough samples arrive. Runs
//! with [`crate::DedupePolicy::Manual`] — an incident is only marked
//! handled after its aggregate ships, so multiple readings per
//! incident get through.

use std::collections::{HashMap, VecDeque};

use klr_core::{IdGen, Signal, UuidIdGen};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::{Zooid, ZooidContext};

/// Samples required before an aggregate observation is emitted.
const AGGREGATION_THRESHOLD: usize = 3;

/// Incidents tracked at once; the oldest half is pruned past this.
const MAX_TRACKED_INCIDENTS: usize = 100;

/// Aggregating latency tracker.
///
/// Signals arriving without an incident id get one synthesized from
/// the injected generator.
#[derive(Debug, Default)]
pub struct LatencyTracker<G: IdGen = UuidIdGen> {
    readings: HashMap<String, Vec<f64>>,
    arrival_order: VecDeque<String>,
    id_gen: G,
}

impl LatencyTracker<UuidIdGen> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: IdGen> LatencyTracker<G> {
    pub fn with_id_gen(id_gen: G) -> Self {
        Self {
            readings: HashMap::new(),
            arrival_order: VecDeque::new(),
            id_gen,
        }
    }

    fn prune(&mut self) {
        while self.readings.len() > MAX_TRACKED_INCIDENTS {
            let Some(oldest) = self.arrival_order.pop_front() else {
                return;
            };
            if self.readings.remove(&oldest).is_some() {
                debug!(incident = %oldest, "pruned incomplete incident");
            }
        }
    }
}

impl<G: IdGen> Zooid for LatencyTracker<G> {
    fn on_message(&mut self, signal: &Signal, ctx: &mut ZooidContext) {
        let incident_id = signal
            .incident_id
            .clone()
            .unwrap_or_else(|| self.id_gen.incident());

        let Some(p95_ms) = signal.facts.get("p95_ms").and_then(Value::as_f64) else {
            warn!(incident = %incident_id, "no p95_ms in facts");
            return;
        };

        info!(incident = %incident_id, p95_ms, "observed spike");

        let samples = self.readings.entry(incident_id.clone()).or_insert_with(|| {
            self.arrival_order.push_back(incident_id.clone());
            Vec::new()
        });
        samples.push(p95_ms);

        if samples.len() >= AGGREGATION_THRESHOLD {
            let mut sorted = samples.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = sorted[sorted.len() / 2];
            let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
            let max = sorted[sorted.len() - 1];

            info!(
                incident = %incident_id,
                samples = sorted.len(),
                median,
                mean,
                max,
                "aggregated readings",
            );

            let mut extras = Map::new();
            extras.insert("p95_ms_median".to_string(), json!(median));
            extras.insert("p95_ms_mean".to_string(), json!(mean));
            extras.insert("p95_ms_max".to_string(), json!(max));
            extras.insert("sample_count".to_string(), json!(sorted.len()));

            ctx.emit_observation(&incident_id, Some(true), None, extras);
            ctx.mark_handled(&incident_id);

            self.readings.remove(&incident_id);
            self.arrival_order.retain(|inc| inc != &incident_id);
        }

        self.prune();
    }

    fn health(&self) -> Value {
        json!({
            "status": "ok",
            "incidents_tracked": self.readings.len(),
        })
    }
}

#[cfg(test)]
#[path = "latency_tracker_tests.rs"]
mod tests;
