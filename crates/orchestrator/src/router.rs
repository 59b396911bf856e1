// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intent router: durable intent files → transient bus signals.
//!
//! File existence is the source of truth — files are deleted on
//! success, moved to the dead-letter queue on unrecoverable error, and
//! a restart re-publishes only what remains on disk. Unknown intent
//! types are no-ops (deleted as success). When the chem path is
//! disabled the router leaves everything in place for the legacy RPC
//! bridge.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use klr_bus::SignalPublisher;
use klr_core::{topics, Signal};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

/// Router I/O errors (scanning, DLQ writes).
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One durable intent request.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentFile {
    #[serde(rename = "type")]
    pub intent_type: String,
    pub id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Counters for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub routed: u64,
    pub dead_lettered: u64,
    pub ignored: u64,
}

/// The closed intent-type → (topic, ecosystem) map.
fn map_intent(intent_type: &str) -> Option<(&'static str, &'static str)> {
    match intent_type {
        "discover.module" | "reinvestigate" => {
            Some((topics::Q_CURIOSITY_INVESTIGATE, "introspection"))
        }
        "queue.latency_spike" => Some((topics::Q_LATENCY_SPIKE, "queue_management")),
        "queue.stall" => Some((topics::Q_STALL, "queue_management")),
        "queue.congestion_forecast" => Some((topics::Q_CONGESTION_FORECAST, "queue_management")),
        "queue.orphaned" => Some((topics::Q_ORPHANED_QUEUE, "queue_management")),
        _ => None,
    }
}

/// Scans an intent directory and publishes mapped signals.
pub struct IntentRouter {
    intent_dir: PathBuf,
    dlq_path: PathBuf,
    /// Mirrors `KLR_CHEM_ENABLED`; disabled leaves files for the
    /// legacy path.
    enabled: bool,
}

impl IntentRouter {
    pub fn new(intent_dir: impl Into<PathBuf>, dlq_path: impl Into<PathBuf>, enabled: bool) -> Self {
        let router = Self {
            intent_dir: intent_dir.into(),
            dlq_path: dlq_path.into(),
            enabled,
        };
        if router.enabled {
            info!("intent router: chem signal mode enabled");
        } else {
            warn!("intent router: chem signal mode disabled, legacy RPC path");
        }
        router
    }

    /// One pass over the intent directory.
    pub async fn scan_once(
        &self,
        publisher: &mut SignalPublisher,
        now: f64,
    ) -> Result<RouteStats, RouterError> {
        let mut stats = RouteStats::default();
        if !self.enabled {
            return Ok(stats);
        }

        let entries = match fs::read_dir(&self.intent_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();

        for path in files {
            self.route_intent(&path, publisher, now, &mut stats).await?;
        }
        Ok(stats)
    }

    /// Route one intent file: publish and delete, dead-letter on
    /// malformed JSON, delete unknown types as no-ops.
    pub async fn route_intent(
        &self,
        path: &Path,
        publisher: &mut SignalPublisher,
        now: f64,
        stats: &mut RouteStats,
    ) -> Result<(), RouterError> {
        let content = fs::read_to_string(path)?;

        let intent: IntentFile = match serde_json::from_str(&content) {
            Ok(intent) => intent,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "malformed intent, dead-lettering");
                self.dead_letter(path, &content, &e.to_string(), now)?;
                fs::remove_file(path)?;
                stats.dead_lettered += 1;
                return Ok(());
            }
        };

        let Some((topic, ecosystem)) = map_intent(&intent.intent_type) else {
            info!(
                file = %path.display(),
                intent_type = %intent.intent_type,
                "unknown intent type, dropping as no-op",
            );
            fs::remove_file(path)?;
            stats.ignored += 1;
            return Ok(());
        };

        let mut facts = intent.data.clone();
        facts.insert("question_id".to_string(), json!(intent.id));

        let signal = Signal::new(topic, ecosystem, now)
            .with_facts(facts)
            .with_incident(intent.id.clone());
        publisher.publish(&signal).await;

        fs::remove_file(path)?;
        stats.routed += 1;
        info!(intent_type = %intent.intent_type, topic, id = %intent.id, "routed intent");
        Ok(())
    }

    /// Append `{ts, error, intent_file, snapshot}` to the DLQ file.
    fn dead_letter(
        &self,
        path: &Path,
        content: &str,
        error: &str,
        now: f64,
    ) -> Result<(), RouterError> {
        if let Some(parent) = self.dlq_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = json!({
            "ts": now,
            "error": error,
            "intent_file": path.display().to_string(),
            "snapshot": content,
        });

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.dlq_path)?;
        writeln!(file, "{record}")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
