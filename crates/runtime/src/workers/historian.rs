// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus historian.
//!
//! Subscribes to everything (empty prefix) and appends each signal to
//! a rolling history JSONL, stamped with a reception timestamp. The
//! introspection side consolidates old segments offline; the historian
//! only performs emergency tail-keep rotation when the file outgrows
//! its bound. Runs with [`crate::DedupePolicy::Disabled`] — history
//! means every signal, replays included.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use klr_core::Signal;
use klr_ledger::writer::rotate_tail;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{Zooid, ZooidContext};

/// Historian file limits.
#[derive(Debug, Clone)]
pub struct HistorianConfig {
    pub path: PathBuf,
    pub max_size_bytes: u64,
    pub keep_lines: usize,
}

impl HistorianConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: 50 * 1024 * 1024,
            keep_lines: 100_000,
        }
    }
}

/// Appends every signal to the history file.
#[derive(Debug)]
pub struct Historian {
    config: HistorianConfig,
    message_count: u64,
    window_count: u64,
    last_stats_ts: f64,
}

impl Historian {
    pub fn new(config: HistorianConfig) -> Self {
        Self {
            config,
            message_count: 0,
            window_count: 0,
            last_stats_ts: 0.0,
        }
    }

    fn append(&mut self, signal: &Signal, received_ts: f64) -> std::io::Result<()> {
        if let Some(parent) = self.config.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut value = serde_json::to_value(signal).unwrap_or(Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert("_historian_ts".to_string(), json!(received_ts));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)?;
        let line = value.to_string();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        let size = file.metadata()?.len();
        drop(file);
        if size > self.config.max_size_bytes {
            self.emergency_rotate(size)?;
        }
        Ok(())
    }

    /// Tail-keep rotation, shared with the ledger writer: newest
    /// `keep_lines` stay in place, the rest moves to `.old`.
    fn emergency_rotate(&mut self, size: u64) -> std::io::Result<()> {
        warn!(
            path = %self.config.path.display(),
            size_mb = size / (1024 * 1024),
            "emergency rotation triggered",
        );

        let rotation = rotate_tail(&self.config.path, self.config.keep_lines)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        if let Some(rotation) = rotation {
            info!(
                kept_lines = self.config.keep_lines,
                kept_bytes = rotation.kept_bytes,
                "emergency rotation complete",
            );
        }
        Ok(())
    }
}

impl Zooid for Historian {
    fn on_message(&mut self, signal: &Signal, ctx: &mut ZooidContext) {
        let now = ctx.now();
        if let Err(e) = self.append(signal, now) {
            error!(error = %e, "failed to capture signal");
            return;
        }

        self.message_count += 1;
        self.window_count += 1;
        if now - self.last_stats_ts >= 60.0 {
            if self.last_stats_ts > 0.0 {
                info!(captured = self.window_count, "history captures in last 60s");
            }
            self.window_count = 0;
            self.last_stats_ts = now;
        }
    }

    fn health(&self) -> Value {
        json!({
            "status": "ok",
            "messages_captured": self.message_count,
        })
    }
}

#[cfg(test)]
#[path = "historian_tests.rs"]
mod tests;
