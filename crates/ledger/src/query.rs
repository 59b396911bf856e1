// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only ledger queries.
//!
//! Scans are line-oriented over the live ledger file; rotation can race
//! a reader between renames, so a missing file reads as empty.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use klr_core::Observation;
use tracing::debug;

use crate::LedgerError;

/// Aggregate fitness for one zooid over a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitnessSummary {
    pub success_rate: f64,
    pub avg_ttr_ms: f64,
    pub total_incidents: u64,
    pub avg_fitness: f64,
}

/// Read-only handle on the ledger file.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    path: PathBuf,
}

impl LedgerQuery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Scan rows newer than `now - window_s`; malformed lines are
    /// skipped.
    fn scan(&self, cutoff: f64, mut visit: impl FnMut(&Observation)) -> Result<(), LedgerError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row: Observation = match serde_json::from_str(trimmed) {
                Ok(row) => row,
                Err(e) => {
                    debug!(error = %e, "skipping malformed ledger line");
                    continue;
                }
            };
            if row.ts >= cutoff {
                visit(&row);
            }
        }
        Ok(())
    }

    /// All rows newer than `cutoff`, oldest first (file order).
    ///
    /// Used by the quarantine sweeper to feed `check_quarantine`.
    pub fn rows_since(&self, cutoff: f64) -> Result<Vec<Observation>, LedgerError> {
        let mut rows = Vec::new();
        self.scan(cutoff, |row| rows.push(row.clone()))?;
        Ok(rows)
    }

    /// Recent fitness stats for one zooid.
    pub fn get_recent_fitness(
        &self,
        zooid: &str,
        window_s: f64,
        now: f64,
    ) -> Result<FitnessSummary, LedgerError> {
        let mut total = 0u64;
        let mut successes = 0u64;
        let mut ttrs: Vec<f64> = Vec::new();
        let mut fitnesses: Vec<f64> = Vec::new();

        self.scan(now - window_s, |row| {
            if row.zooid != zooid {
                return;
            }
            total += 1;
            if row.ok == Some(true) {
                successes += 1;
            }
            if let Some(ttr) = row.ttr_ms {
                ttrs.push(ttr);
            }
            if let Some(fitness) = row.extras.get("composite_fitness").and_then(|v| v.as_f64()) {
                fitnesses.push(fitness);
            }
        })?;

        Ok(FitnessSummary {
            success_rate: ratio(successes, total),
            avg_ttr_ms: mean(&ttrs),
            total_incidents: total,
            avg_fitness: mean(&fitnesses),
        })
    }

    /// Ecological pressure for a niche, 0.0–1.0.
    ///
    /// `0.7 * failure_rate + 0.3 * min(1, volume / 100)`; defaults to
    /// moderate pressure (0.5) with no data in the window.
    pub fn compute_niche_pressure(
        &self,
        ecosystem: &str,
        niche: &str,
        window_s: f64,
        now: f64,
    ) -> Result<f64, LedgerError> {
        let mut total = 0u64;
        let mut failures = 0u64;

        self.scan(now - window_s, |row| {
            if row.niche != niche || row.ecosystem != ecosystem {
                return;
            }
            total += 1;
            if row.ok == Some(false) {
                failures += 1;
            }
        })?;

        if total == 0 {
            return Ok(0.5);
        }

        let failure_rate = failures as f64 / total as f64;
        let incident_pressure = (total as f64 / 100.0).min(1.0);
        Ok(failure_rate * 0.7 + incident_pressure * 0.3)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
