// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry reconciliation.
//!
//! Restores the index invariants after a crash, a torn writer, or a
//! hand-edited document. Applied fixes are returned as human-readable
//! strings so the caller can log them; running reconcile twice in a
//! row yields zero fixes on the second pass.

use crate::model::ALL_STATES;
use crate::Registry;

/// Enforce registry invariants, returning the list of fixes applied.
///
/// Rules, in order:
/// 1. Names in a niche list with no record in `zooids` are removed.
/// 2. Every zooid appears exactly once, in its own niche's list for its
///    `lifecycle_state`; stray and duplicate entries are dropped and a
///    missing entry is added.
/// 3. `genomes` bindings whose zooid no longer exists are pruned.
pub fn reconcile(registry: &mut Registry) -> Vec<String> {
    let mut fixes = Vec::new();

    // Rule 1: drop unknown names from every list.
    let known: std::collections::BTreeSet<String> = registry.zooids.keys().cloned().collect();
    for (niche_name, index) in registry.niches.iter_mut() {
        for state in ALL_STATES {
            let list = index.list_mut(state);
            let stale: Vec<String> = list.iter().filter(|n| !known.contains(*n)).cloned().collect();
            if !stale.is_empty() {
                list.retain(|n| known.contains(n));
                for name in stale {
                    fixes.push(format!(
                        "removed unknown zooid '{name}' from niche '{niche_name}' {} list",
                        state.as_str().to_lowercase(),
                    ));
                }
            }
        }
    }

    // Rule 2: each zooid lives in exactly one list, the right one.
    let placements: Vec<(String, String, klr_core::LifecycleState)> = registry
        .zooids
        .values()
        .map(|z| (z.name.clone(), z.niche.clone(), z.lifecycle_state))
        .collect();

    for (name, niche, state) in placements {
        // Remove appearances under foreign niches.
        for (other_niche, index) in registry.niches.iter_mut() {
            if *other_niche == niche {
                continue;
            }
            let removed = index.remove_everywhere(&name);
            if removed > 0 {
                fixes.push(format!(
                    "removed zooid '{name}' from foreign niche '{other_niche}'"
                ));
            }
        }

        let index = registry.niche_mut(&niche);
        let holding = index.states_holding(&name);
        let occurrences: usize = ALL_STATES
            .into_iter()
            .map(|s| index.list(s).iter().filter(|n| *n == &name).count())
            .sum();

        let correctly_placed = holding == vec![state] && occurrences == 1;
        if correctly_placed {
            continue;
        }

        index.remove_everywhere(&name);
        index.list_mut(state).push(name.clone());
        if holding.is_empty() {
            fixes.push(format!(
                "indexed missing zooid '{name}' under niche '{niche}' {}",
                state.as_str().to_lowercase(),
            ));
        } else {
            fixes.push(format!(
                "moved zooid '{name}' to niche '{niche}' {} list",
                state.as_str().to_lowercase(),
            ));
        }
    }

    // Rule 3: prune genome bindings to missing zooids.
    let orphaned: Vec<String> = registry
        .genomes
        .iter()
        .filter(|(_, bound)| !registry.zooids.contains_key(*bound))
        .map(|(hash, _)| hash.clone())
        .collect();
    for hash in orphaned {
        if let Some(bound) = registry.genomes.remove(&hash) {
            fixes.push(format!(
                "pruned genome binding '{hash}' to missing zooid '{bound}'"
            ));
        }
    }

    fixes
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
