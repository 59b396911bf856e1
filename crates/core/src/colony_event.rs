// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle state-change events.
//!
//! Every transition emits exactly one of these so the orchestrator can
//! reconcile external effects (e.g. a unit that was stopped on demotion).

use crate::zooid::LifecycleState;
use serde::{Deserialize, Serialize};

/// External effect taken alongside a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    Noop,
    SystemdStop,
}

/// Payload of a `zooid_state_change` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    /// Always `"zooid_state_change"`; kept as a field so serialized
    /// events are self-describing in mixed streams.
    pub event: String,
    pub zooid: String,
    pub from: LifecycleState,
    pub to: LifecycleState,
    /// e.g. `phase_batch:<id>`, `prod_guard_trip`, `demotion_ceiling`.
    pub reason: String,
    pub genome_hash: String,
    pub service_action: ServiceAction,
    pub ts: f64,
    /// Failure provenance, present on quarantine demotions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures_in_window: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_sec: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demotions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until_ts: Option<f64>,
}

impl StateChangeEvent {
    pub fn new(
        zooid: impl Into<String>,
        from: LifecycleState,
        to: LifecycleState,
        reason: impl Into<String>,
        genome_hash: impl Into<String>,
        ts: f64,
    ) -> Self {
        Self {
            event: "zooid_state_change".to_string(),
            zooid: zooid.into(),
            from,
            to,
            reason: reason.into(),
            genome_hash: genome_hash.into(),
            service_action: ServiceAction::Noop,
            ts,
            failures_in_window: None,
            window_sec: None,
            demotions: None,
            cooldown_until_ts: None,
        }
    }

    pub fn with_service_action(mut self, action: ServiceAction) -> Self {
        self.service_action = action;
        self
    }

    /// Attach quarantine provenance.
    pub fn with_failure_burst(
        mut self,
        failures_in_window: u32,
        window_sec: u64,
        demotions: u32,
    ) -> Self {
        self.failures_in_window = Some(failures_in_window);
        self.window_sec = Some(window_sec);
        self.demotions = Some(demotions);
        self
    }

    pub fn with_cooldown(mut self, cooldown_until_ts: f64) -> Self {
        self.cooldown_until_ts = Some(cooldown_until_ts);
        self
    }

    pub fn log_summary(&self) -> String {
        format!(
            "zooid_state_change zooid={} {}->{} reason={}",
            self.zooid, self.from, self.to, self.reason
        )
    }
}
