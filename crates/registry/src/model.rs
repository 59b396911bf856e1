// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The registry document and its per-niche indexes.

use std::collections::BTreeMap;

use klr_core::{LifecycleState, ZooidRecord};
use serde::{Deserialize, Serialize};

/// Four disjoint ordered name lists per niche.
///
/// Invariants (enforced by [`crate::reconcile`]): every name appears in
/// exactly one list, and the list matches the zooid's
/// `lifecycle_state`. Retired is terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicheIndex {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub probation: Vec<String>,
    #[serde(default)]
    pub dormant: Vec<String>,
    #[serde(default)]
    pub retired: Vec<String>,
}

impl NicheIndex {
    pub fn list(&self, state: LifecycleState) -> &Vec<String> {
        match state {
            LifecycleState::Active => &self.active,
            LifecycleState::Probation => &self.probation,
            LifecycleState::Dormant => &self.dormant,
            LifecycleState::Retired => &self.retired,
        }
    }

    pub fn list_mut(&mut self, state: LifecycleState) -> &mut Vec<String> {
        match state {
            LifecycleState::Active => &mut self.active,
            LifecycleState::Probation => &mut self.probation,
            LifecycleState::Dormant => &mut self.dormant,
            LifecycleState::Retired => &mut self.retired,
        }
    }

    /// Remove `name` from every list; returns how many entries went away.
    pub fn remove_everywhere(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for state in ALL_STATES {
            let list = self.list_mut(state);
            let before = list.len();
            list.retain(|n| n != name);
            removed += before - list.len();
        }
        removed
    }

    /// The states whose lists currently contain `name`.
    pub fn states_holding(&self, name: &str) -> Vec<LifecycleState> {
        ALL_STATES
            .into_iter()
            .filter(|state| self.list(*state).iter().any(|n| n == name))
            .collect()
    }
}

pub(crate) const ALL_STATES: [LifecycleState; 4] = [
    LifecycleState::Active,
    LifecycleState::Probation,
    LifecycleState::Dormant,
    LifecycleState::Retired,
];

/// The whole registry document. Serialized as one JSON object;
/// `BTreeMap`s keep the on-disk bytes stable across writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub niches: BTreeMap<String, NicheIndex>,
    #[serde(default)]
    pub zooids: BTreeMap<String, ZooidRecord>,
    /// genome_hash → zooid name; at most one binding per hash.
    #[serde(default)]
    pub genomes: BTreeMap<String, String>,
    #[serde(default)]
    pub version: u64,
}

impl Registry {
    /// A well-formed empty registry at version 0.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn niche_mut(&mut self, niche: &str) -> &mut NicheIndex {
        self.niches.entry(niche.to_string()).or_default()
    }

    /// Insert a zooid, indexing it under its niche and binding its
    /// genome hash. An existing binding for the hash is overwritten —
    /// one zooid per genome at a time.
    pub fn add_zooid(&mut self, record: ZooidRecord) {
        let name = record.name.clone();
        let niche = record.niche.clone();
        let state = record.lifecycle_state;
        let genome = record.genome_hash.clone();

        self.niche_mut(&niche).list_mut(state).push(name.clone());
        self.genomes.insert(genome, name.clone());
        self.zooids.insert(name, record);
    }

    /// Move a zooid to `to`, updating both the record and the niche
    /// lists. Returns the previous state, or `None` when the zooid is
    /// unknown or already in `to`.
    pub(crate) fn relocate(&mut self, name: &str, to: LifecycleState) -> Option<LifecycleState> {
        let record = self.zooids.get_mut(name)?;
        let from = record.lifecycle_state;
        if from == to {
            return None;
        }
        record.lifecycle_state = to;
        let niche = record.niche.clone();

        let index = self.niche_mut(&niche);
        index.remove_everywhere(name);
        index.list_mut(to).push(name.to_string());
        Some(from)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
