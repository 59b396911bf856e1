// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Promotion validation and acknowledgment.
//!
//! Dream cycles drop promotion JSON files; the orchestrator validates
//! schema and parameter bounds and writes an acknowledgment alongside.
//! Bad input never stops the pipeline — it produces a rejected ack.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::CommitError;

/// Registered parameter bounds. Unknown parameters pass through
/// unchecked (recorded as-is).
#[derive(Debug, Clone, Default)]
pub struct ParamBounds {
    pub min: BTreeMap<String, f64>,
    pub max: BTreeMap<String, f64>,
}

impl ParamBounds {
    /// The stock bounds for evolvable parameters.
    pub fn standard() -> Self {
        let mut min = BTreeMap::new();
        let mut max = BTreeMap::new();
        for (param, lo, hi) in [
            ("learning_rate", 0.0001, 0.1),
            ("batch_size", 1.0, 128.0),
            ("temperature", 0.1, 2.0),
            ("context_window", 1000.0, 32000.0),
        ] {
            min.insert(param.to_string(), lo);
            max.insert(param.to_string(), hi);
        }
        Self { min, max }
    }
}

/// A validated promotion.
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    pub schema: String,
    pub id: String,
    pub timestamp: f64,
    /// Only non-negativity is enforced; the source applies no upper
    /// bound or acceptance threshold.
    pub fitness: f64,
    pub changes: BTreeMap<String, f64>,
}

/// Tagged validation result — bad input is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PromotionOutcome {
    Accepted(Promotion),
    Rejected(String),
}

/// Validate a promotion file against the bounds registry.
///
/// Only real I/O failures surface as errors; everything else becomes
/// a [`PromotionOutcome::Rejected`] with the reason.
pub fn validate_promotion_file(
    path: &Path,
    bounds: &ParamBounds,
) -> Result<PromotionOutcome, std::io::Error> {
    let content = fs::read(path)?;
    let parsed: Value = match serde_json::from_slice(&content) {
        Ok(value) => value,
        Err(e) => return Ok(PromotionOutcome::Rejected(format!("JSON decode error: {e}"))),
    };
    Ok(validate_promotion(&parsed, bounds))
}

/// Validate an already-parsed promotion document.
pub fn validate_promotion(promo: &Value, bounds: &ParamBounds) -> PromotionOutcome {
    use PromotionOutcome::Rejected;

    let Some(obj) = promo.as_object() else {
        return Rejected("Promotion must be an object".to_string());
    };

    let Some(schema) = obj.get("schema").and_then(Value::as_str) else {
        return Rejected("Missing schema field".to_string());
    };
    if schema != "v1" && schema != "v2" {
        return Rejected(format!("Unsupported schema version: {schema}"));
    }

    for field in ["id", "timestamp", "fitness", "changes"] {
        if !obj.contains_key(field) {
            return Rejected(format!("Missing required field: {field}"));
        }
    }

    let Some(id) = obj.get("id").and_then(Value::as_str) else {
        return Rejected("Invalid id: expected string".to_string());
    };
    let Some(timestamp) = obj.get("timestamp").and_then(Value::as_f64) else {
        return Rejected("Invalid timestamp: expected number".to_string());
    };

    let Some(fitness) = obj.get("fitness").and_then(Value::as_f64) else {
        return Rejected("Invalid fitness type".to_string());
    };
    if fitness < 0.0 {
        return Rejected(format!("Negative fitness: {fitness}"));
    }

    let Some(changes_obj) = obj.get("changes").and_then(Value::as_object) else {
        return Rejected("Changes must be an object".to_string());
    };

    let mut changes = BTreeMap::new();
    for (param, value) in changes_obj {
        let Some(value) = value.as_f64() else {
            return Rejected(format!("Non-numeric value for {param}: {value}"));
        };
        if let Some(min) = bounds.min.get(param) {
            if value < *min {
                return Rejected(format!("{param} below minimum: {value} < {min}"));
            }
        }
        if let Some(max) = bounds.max.get(param) {
            if value > *max {
                return Rejected(format!("{param} above maximum: {value} > {max}"));
            }
        }
        changes.insert(param.clone(), value);
    }

    PromotionOutcome::Accepted(Promotion {
        schema: schema.to_string(),
        id: id.to_string(),
        timestamp,
        fitness,
        changes,
    })
}

/// Acknowledgment payload written next to the promotions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub promotion_id: String,
    pub accepted: bool,
    pub phase_epoch: String,
    pub phase_sha: String,
    pub ts: u64,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Write the acknowledgment file for a promotion.
pub fn create_ack(
    ack_dir: &Path,
    promotion_stem: &str,
    accepted: bool,
    phase_epoch: &str,
    phase_sha: &str,
    rejection_reason: Option<String>,
    now: f64,
) -> Result<PathBuf, CommitError> {
    fs::create_dir_all(ack_dir)?;

    let ack = Ack {
        promotion_id: promotion_stem.to_string(),
        accepted,
        phase_epoch: phase_epoch.to_string(),
        phase_sha: phase_sha.to_string(),
        ts: now as u64,
        schema: "v1".to_string(),
        rejection_reason: if accepted { None } else { rejection_reason },
    };

    let ack_path = ack_dir.join(format!("{promotion_stem}_ack.json"));
    fs::write(&ack_path, serde_json::to_vec_pretty(&ack)?)?;

    info!(promotion = promotion_stem, accepted, "created promotion ack");
    Ok(ack_path)
}

/// Promotions with no matching acknowledgment, oldest first.
pub fn scan_unacked(promotions_dir: &Path, ack_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(promotions_dir) else {
        return Vec::new();
    };

    let mut unacked: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .filter(|path| {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                return false;
            };
            !ack_dir.join(format!("{stem}_ack.json")).exists()
        })
        .collect();
    unacked.sort();
    unacked
}

#[cfg(test)]
#[path = "promotion_tests.rs"]
mod tests;
