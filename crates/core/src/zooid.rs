// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zooid identity records and lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle of a zooid. RETIRED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    Dormant,
    Probation,
    Active,
    Retired,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Dormant => "DORMANT",
            LifecycleState::Probation => "PROBATION",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Retired => "RETIRED",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PHASE test-batch bookkeeping for one zooid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Batch ids this zooid has been enrolled in (no duplicates).
    #[serde(default)]
    pub batches: Vec<String>,
    /// Evidence rows accumulated across batches.
    #[serde(default)]
    pub evidence: u64,
    /// Mean composite fitness over accumulated evidence.
    #[serde(default)]
    pub fitness_mean: f64,
}

/// Quarantine backoff policy state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// No demotion may fire again before this instant.
    #[serde(default)]
    pub cooldown_until_ts: f64,
}

/// A long-lived worker identity in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZooidRecord {
    /// Unique within the process colony.
    pub name: String,
    /// Functional role, e.g. `latency_monitoring`.
    pub niche: String,
    /// Broader grouping, e.g. `prod_guard`.
    pub ecosystem: String,
    /// Content hash of the zooid's code/config. At most one zooid may
    /// be bound to a hash at a time.
    pub genome_hash: String,
    pub lifecycle_state: LifecycleState,
    /// Ordered ancestor names, oldest first.
    #[serde(default)]
    pub parent_lineage: Vec<String>,
    /// When the zooid entered the registry.
    #[serde(default)]
    pub entered_ts: f64,
    /// When the zooid was last promoted to ACTIVE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_ts: Option<f64>,
    #[serde(default)]
    pub demotions: u32,
    #[serde(default)]
    pub phase: PhaseRecord,
    #[serde(default)]
    pub policy: PolicyRecord,
}

impl ZooidRecord {
    /// A fresh DORMANT zooid.
    pub fn new(
        name: impl Into<String>,
        niche: impl Into<String>,
        ecosystem: impl Into<String>,
        genome_hash: impl Into<String>,
        entered_ts: f64,
    ) -> Self {
        Self {
            name: name.into(),
            niche: niche.into(),
            ecosystem: ecosystem.into(),
            genome_hash: genome_hash.into(),
            lifecycle_state: LifecycleState::Dormant,
            parent_lineage: Vec::new(),
            entered_ts,
            promoted_ts: None,
            demotions: 0,
            phase: PhaseRecord::default(),
            policy: PolicyRecord::default(),
        }
    }
}

#[cfg(test)]
#[path = "zooid_tests.rs"]
mod tests;
