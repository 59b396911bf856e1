// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator tick.
//!
//! Driven by an external timer. Each tick runs the first matching
//! branch in priority order — PHASE window, pending promotions, idle
//! dream cycle — and defers the rest to later ticks. Every branch
//! holds its own exclusive lock; contention means another process is
//! already on it, so the branch is skipped, never errored.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;
use klr_core::{IdGen, UuidIdGen};
use tracing::{debug, info, warn};

use crate::baseline::BaselineManager;
use crate::dream::{self, DreamConfig};
use crate::locks::{LockError, LockManager};
use crate::phase::{self, PhaseConfig};
use crate::promotion::{
    create_ack, scan_unacked, validate_promotion_file, ParamBounds, PromotionOutcome,
};

/// The closed set of tick results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    Noop,
    PhaseRunning,
    PromotionApplied,
    DreamRunning,
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickOutcome::Disabled => "DISABLED",
            TickOutcome::Noop => "NOOP",
            TickOutcome::PhaseRunning => "PHASE_RUNNING",
            TickOutcome::PromotionApplied => "PROMOTION_APPLIED",
            TickOutcome::DreamRunning => "DREAM_RUNNING",
        }
    }
}

impl std::fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator wiring.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub lock_dir: PathBuf,
    pub baseline_dir: PathBuf,
    pub promotions_dir: PathBuf,
    pub ack_dir: PathBuf,
    pub bounds: ParamBounds,
    /// PHASE branch; absent disables it.
    pub phase: Option<PhaseConfig>,
    /// Dream branch; absent disables it.
    pub dream: Option<DreamConfig>,
    pub lock_ttl_s: f64,
    pub actor: String,
}

/// The single-tick state machine.
#[derive(Debug)]
pub struct Orchestrator<G: IdGen = UuidIdGen> {
    locks: LockManager,
    baseline: BaselineManager,
    config: OrchestratorConfig,
    id_gen: G,
}

impl Orchestrator<UuidIdGen> {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_id_gen(config, UuidIdGen)
    }
}

impl<G: IdGen> Orchestrator<G> {
    pub fn with_id_gen(config: OrchestratorConfig, id_gen: G) -> Self {
        Self {
            locks: LockManager::new(&config.lock_dir),
            baseline: BaselineManager::new(&config.baseline_dir),
            config,
            id_gen,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn baseline(&self) -> &BaselineManager {
        &self.baseline
    }

    /// One tick. Quick, idempotent, safe to call under any failure.
    pub async fn tick(&self) -> TickOutcome {
        if !crate::env::orchestration_enabled() {
            return TickOutcome::Disabled;
        }

        let now_local = Local::now();

        // 1. PHASE window.
        if let Some(phase_config) = &self.config.phase {
            let date = now_local.date_naive();
            let time = now_local.time();
            if phase_config.window.contains(time) && !phase::ran_today(phase_config, date) {
                match self.locks.acquire("phase", self.config.lock_ttl_s) {
                    Ok(lock) => {
                        if let Err(e) = phase::mark_ran(phase_config, date) {
                            warn!(error = %e, "failed to write PHASE marker");
                        }
                        let phase_config = phase_config.clone();
                        tokio::spawn(async move {
                            let _ = phase::run_batch(&phase_config).await;
                            drop(lock);
                        });
                        return TickOutcome::PhaseRunning;
                    }
                    Err(LockError::Held { pid, .. }) => {
                        debug!(pid, "phase lock held, deferring branch");
                    }
                    Err(e) => warn!(error = %e, "phase lock error"),
                }
            }
        }

        // 2. Pending promotions.
        let unacked = scan_unacked(&self.config.promotions_dir, &self.config.ack_dir);
        if !unacked.is_empty() {
            match self.locks.acquire("orchestrator", self.config.lock_ttl_s) {
                Ok(lock) => {
                    let applied = self.apply_promotions(&unacked, epoch_now());
                    drop(lock);
                    if applied {
                        return TickOutcome::PromotionApplied;
                    }
                }
                Err(LockError::Held { pid, .. }) => {
                    debug!(pid, "orchestrator lock held, deferring promotions");
                }
                Err(e) => warn!(error = %e, "orchestrator lock error"),
            }
        }

        // 3. Idle: launch one dream cycle.
        if let Some(dream_config) = &self.config.dream {
            match self.locks.acquire("dream", self.config.lock_ttl_s) {
                Ok(lock) => {
                    let dream_config = dream_config.clone();
                    let run_tag = self.id_gen.run_tag(epoch_now());
                    tokio::spawn(async move {
                        dream::run_locked(lock, dream_config, run_tag).await;
                    });
                    return TickOutcome::DreamRunning;
                }
                Err(LockError::Held { pid, .. }) => {
                    debug!(pid, "dream lock held, deferring branch");
                }
                Err(e) => warn!(error = %e, "dream lock error"),
            }
        }

        TickOutcome::Noop
    }

    /// Validate each pending promotion, ack it, and commit accepted
    /// changes into the baseline. Returns whether any file was
    /// processed (accepted or rejected).
    fn apply_promotions(&self, unacked: &[PathBuf], now: f64) -> bool {
        let phase_epoch = Local::now().format("%Y-%m-%d").to_string();
        let mut processed = false;

        for path in unacked {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let outcome = match validate_promotion_file(path, &self.config.bounds) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(promotion = stem, error = %e, "unreadable promotion file");
                    continue;
                }
            };

            match outcome {
                PromotionOutcome::Accepted(promotion) => {
                    match self.commit_promotion(&promotion) {
                        Ok(sha) => {
                            let _ = create_ack(
                                &self.config.ack_dir,
                                stem,
                                true,
                                &phase_epoch,
                                &sha,
                                None,
                                now,
                            );
                            info!(promotion = stem, "promotion applied");
                            processed = true;
                        }
                        Err(e) => {
                            // Baseline left intact; the promotion stays
                            // unacked for a retry on a later tick.
                            warn!(promotion = stem, error = %e, "baseline commit failed");
                        }
                    }
                }
                PromotionOutcome::Rejected(reason) => {
                    let current_sha = self
                        .baseline
                        .get_current_version()
                        .ok()
                        .flatten()
                        .map(|m| m.sha256)
                        .unwrap_or_default();
                    let _ = create_ack(
                        &self.config.ack_dir,
                        stem,
                        false,
                        &phase_epoch,
                        &current_sha,
                        Some(reason.clone()),
                        now,
                    );
                    info!(promotion = stem, reason = %reason, "promotion rejected");
                    processed = true;
                }
            }
        }

        processed
    }

    /// Merge the promotion's changes into the live config and commit.
    /// Returns the new baseline SHA.
    fn commit_promotion(
        &self,
        promotion: &crate::promotion::Promotion,
    ) -> Result<String, crate::CommitError> {
        let mut config = self.baseline.load_config()?;

        if !matches!(config, serde_yaml::Value::Mapping(_)) {
            config = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        }
        if let serde_yaml::Value::Mapping(mapping) = &mut config {
            for (param, value) in &promotion.changes {
                mapping.insert(
                    serde_yaml::Value::String(param.clone()),
                    serde_yaml::Value::Number(serde_yaml::Number::from(*value)),
                );
            }
        }

        let manifest = self.baseline.commit_baseline(
            &config,
            &[promotion.id.clone()],
            &self.config.actor,
            epoch_now(),
        )?;
        Ok(manifest.sha256)
    }
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
