// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quarantine sweeper.
//!
//! Periodically feeds a window of ledger rows through the pure
//! quarantine check and persists the registry when anything changed.
//! The service stop and event sink are injected so the sweep itself
//! stays testable.

use std::time::Duration;

use klr_core::{Clock, StateChangeEvent, SystemClock};
use klr_ledger::LedgerQuery;
use klr_registry::{check_quarantine, reconcile, QuarantineConfig, RegistryStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::RuntimeError;

/// Result of one sweep.
#[derive(Debug, Default, Clone)]
pub struct SweepOutcome {
    /// Names demoted this sweep (to DORMANT or RETIRED).
    pub demoted: Vec<String>,
    /// Reconciliation fixes applied before the check.
    pub fixes: Vec<String>,
}

/// The periodic quarantine monitor.
pub struct QuarantineSweeper {
    store: RegistryStore,
    ledger: LedgerQuery,
    config: QuarantineConfig,
    interval: Duration,
    stop_service: Box<dyn FnMut(&str) + Send>,
    on_event: Box<dyn FnMut(StateChangeEvent) + Send>,
    /// Registry mutations across processes go under the orchestrator
    /// lock when a manager is wired in.
    locks: Option<klr_orchestrator::LockManager>,
}

impl QuarantineSweeper {
    pub fn new(
        store: RegistryStore,
        ledger: LedgerQuery,
        config: QuarantineConfig,
        interval: Duration,
        stop_service: Box<dyn FnMut(&str) + Send>,
        on_event: Box<dyn FnMut(StateChangeEvent) + Send>,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
            interval,
            stop_service,
            on_event,
            locks: None,
        }
    }

    /// Guard registry writes with the shared orchestrator lock.
    pub fn with_locks(mut self, locks: klr_orchestrator::LockManager) -> Self {
        self.locks = Some(locks);
        self
    }

    /// One sweep at `now`: load, reconcile, check, persist if changed.
    ///
    /// When a lock manager is wired in, the whole sweep runs under the
    /// shared `orchestrator` lock; contention defers to the next tick.
    pub fn sweep(&mut self, now: f64) -> Result<SweepOutcome, RuntimeError> {
        let _guard = match &self.locks {
            Some(locks) => match locks.acquire("orchestrator", 600.0) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    info!(reason = %e, "registry busy, deferring sweep");
                    return Ok(SweepOutcome::default());
                }
            },
            None => None,
        };

        let mut registry = self.store.load()?;

        let fixes = reconcile(&mut registry);
        for fix in &fixes {
            warn!(fix = %fix, "registry reconciliation");
        }

        let cutoff = now - self.config.window_sec as f64;
        let rows = self.ledger.rows_since(cutoff)?;

        let demoted = check_quarantine(
            &mut registry,
            &rows,
            now,
            &self.config,
            self.stop_service.as_mut(),
            &mut |event| {
                info!(summary = %event.log_summary(), "quarantine transition");
                (self.on_event)(event);
            },
        );

        if !demoted.is_empty() || !fixes.is_empty() {
            self.store.snapshot_then_atomic_write(&mut registry)?;
        }

        Ok(SweepOutcome { demoted, fixes })
    }

    /// Run sweeps on the interval until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let clock = SystemClock;
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("quarantine sweeper stopping");
                    return;
                }
                _ = tick.tick() => {
                    match self.sweep(clock.now()) {
                        Ok(outcome) if !outcome.demoted.is_empty() => {
                            info!(demoted = ?outcome.demoted, "quarantine sweep demoted zooids");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "quarantine sweep failed"),
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for QuarantineSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuarantineSweeper")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
#[path = "quarantine_sweeper_tests.rs"]
mod tests;
