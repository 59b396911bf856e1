// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PHASE test windows.
//!
//! PHASE batches run inside a configured local-time window, at most
//! once per local date. The "ran today" marker is a file so the
//! constraint survives restarts and is shared across processes.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tracing::info;

use crate::subprocess::{run_one_shot, SubprocessResult};

/// A daily local-time window. Windows may wrap midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PhaseWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `t` falls inside the window (`[start, end)`).
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t < self.end
        } else {
            // Wraps midnight, e.g. 23:30–01:00.
            t >= self.start || t < self.end
        }
    }
}

/// How PHASE batches are launched.
#[derive(Debug, Clone)]
pub struct PhaseConfig {
    pub window: PhaseWindow,
    /// Full argv of the external batch runner.
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    /// Directory holding the daily run markers.
    pub marker_dir: PathBuf,
}

impl PhaseConfig {
    fn marker_path(&self, date: NaiveDate) -> PathBuf {
        self.marker_dir
            .join(format!("phase_ran_{}", date.format("%Y-%m-%d")))
    }
}

/// Whether a PHASE run already completed (or started) on `date`.
pub fn ran_today(config: &PhaseConfig, date: NaiveDate) -> bool {
    config.marker_path(date).exists()
}

/// Record that a PHASE run started on `date`.
pub fn mark_ran(config: &PhaseConfig, date: NaiveDate) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.marker_dir)?;
    std::fs::write(config.marker_path(date), b"")?;
    Ok(())
}

/// Run one PHASE batch to completion.
pub async fn run_batch(config: &PhaseConfig) -> std::io::Result<SubprocessResult> {
    info!(timeout_s = config.timeout.as_secs(), "starting PHASE batch");
    let result = run_one_shot(&config.command, config.cwd.as_deref(), &[], config.timeout).await?;
    info!(
        exit_code = result.exit_code,
        timed_out = result.timed_out,
        duration_s = result.duration_s as u64,
        "PHASE batch finished",
    );
    Ok(result)
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
