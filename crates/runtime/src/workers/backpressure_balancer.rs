// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backpressure control zooid.
//!
//! Proposes a throttle plan fragment when observed p95 crosses the
//! threshold — one proposal per incident, rate-limited by a
//! per-incident cooldown on top of the runtime's replay defense.

use std::collections::HashMap;

use klr_core::{topics, IdGen, Signal, UuidIdGen};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::{Zooid, ZooidContext};

/// p95 below this never triggers a proposal.
const P95_THRESHOLD_MS: f64 = 300.0;

/// Re-proposal cooldown per incident.
const PROPOSAL_COOLDOWN_S: f64 = 5.0;

/// Proposal bookkeeping bound.
const MAX_TRACKED_PROPOSALS: usize = 100;

/// Throttle-proposing balancer.
///
/// Signals arriving without an incident id get one synthesized from
/// the injected generator.
#[derive(Debug, Default)]
pub struct BackpressureBalancer<G: IdGen = UuidIdGen> {
    last_proposed: HashMap<String, f64>,
    id_gen: G,
}

impl BackpressureBalancer<UuidIdGen> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: IdGen> BackpressureBalancer<G> {
    pub fn with_id_gen(id_gen: G) -> Self {
        Self {
            last_proposed: HashMap::new(),
            id_gen,
        }
    }

    fn prune(&mut self) {
        if self.last_proposed.len() <= MAX_TRACKED_PROPOSALS {
            return;
        }
        let mut by_age: Vec<(String, f64)> = self
            .last_proposed
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        by_age.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        for (incident, _) in by_age.into_iter().take(MAX_TRACKED_PROPOSALS / 2) {
            self.last_proposed.remove(&incident);
        }
    }

    fn throttle_percent(p95_ms: f64) -> u32 {
        if p95_ms > 1000.0 {
            25
        } else if p95_ms > 600.0 {
            15
        } else {
            10
        }
    }
}

impl<G: IdGen> Zooid for BackpressureBalancer<G> {
    fn on_message(&mut self, signal: &Signal, ctx: &mut ZooidContext) {
        let now = ctx.now();
        let incident_id = signal
            .incident_id
            .clone()
            .unwrap_or_else(|| self.id_gen.incident());

        if let Some(last) = self.last_proposed.get(&incident_id) {
            if now - last < PROPOSAL_COOLDOWN_S {
                debug!(incident = %incident_id, "proposal cooldown active");
                return;
            }
        }

        let p95_ms = signal
            .facts
            .get("p95_ms")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        if p95_ms < P95_THRESHOLD_MS {
            debug!(incident = %incident_id, p95_ms, "below threshold");
            return;
        }

        let percent = Self::throttle_percent(p95_ms);
        info!(incident = %incident_id, p95_ms, percent, "proposing throttle");

        self.last_proposed.insert(incident_id.clone(), now);
        self.prune();

        let mut facts = Map::new();
        facts.insert("type".to_string(), json!("plan_fragment"));
        facts.insert("actor".to_string(), json!(ctx.name()));
        facts.insert("action".to_string(), json!("throttle"));
        facts.insert("percent".to_string(), json!(percent));
        facts.insert("incident_id".to_string(), json!(incident_id.clone()));
        facts.insert(
            "rationale".to_string(),
            json!(format!("p95 latency {p95_ms}ms exceeds threshold")),
        );

        let plan = Signal::new(topics::PLAN_FRAGMENT, ctx.ecosystem().to_string(), now)
            .with_facts(facts)
            .with_incident(incident_id.clone());
        ctx.emit(plan);
        ctx.mark_handled(&incident_id);
    }

    fn health(&self) -> Value {
        json!({
            "status": "ok",
            "proposals_tracked": self.last_proposed.len(),
        })
    }
}

#[cfg(test)]
#[path = "backpressure_balancer_tests.rs"]
mod tests;
