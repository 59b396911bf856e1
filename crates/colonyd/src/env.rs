// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for colony processes.
//!
//! Every path has an override; the defaults all hang off the state
//! directory (`KLR_STATE_DIR`, falling back to `~/.kloros`).

use std::path::PathBuf;

use klr_bus::BusEndpoints;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("could not determine state directory (set KLR_STATE_DIR or HOME)")]
    NoStateDir,
}

/// Resolve the colony state directory: `KLR_STATE_DIR` > `~/.kloros`.
pub fn state_dir() -> Result<PathBuf, EnvError> {
    if let Ok(dir) = std::env::var("KLR_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| EnvError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".kloros"))
}

/// Bus endpoints: `KLR_UMN_XSUB` / `KLR_UMN_XPUB`, loopback defaults.
pub fn bus_endpoints() -> BusEndpoints {
    let defaults = BusEndpoints::default();
    BusEndpoints::new(
        std::env::var("KLR_UMN_XSUB").unwrap_or(defaults.ingress),
        std::env::var("KLR_UMN_XPUB").unwrap_or(defaults.egress),
    )
}

fn path_override(var: &str, default: PathBuf) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or(default)
}

/// Every on-disk location a colony process may need.
#[derive(Debug, Clone)]
pub struct ColonyPaths {
    pub state_dir: PathBuf,
    pub lock_dir: PathBuf,
    pub intent_dir: PathBuf,
    pub dlq_path: PathBuf,
    pub ledger_path: PathBuf,
    pub registry_path: PathBuf,
    pub baseline_dir: PathBuf,
    pub promotions_dir: PathBuf,
    pub ack_dir: PathBuf,
    pub history_path: PathBuf,
    pub hmac_key_path: PathBuf,
    pub maintenance_flag: PathBuf,
    pub phase_marker_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ColonyPaths {
    pub fn load() -> Result<Self, EnvError> {
        let state_dir = state_dir()?;
        Ok(Self {
            lock_dir: path_override("KLR_LOCK_DIR", state_dir.join("locks")),
            intent_dir: path_override("KLR_INTENT_DIR", state_dir.join("intents")),
            dlq_path: path_override("KLR_DLQ_PATH", state_dir.join("intents_dlq.jsonl")),
            ledger_path: path_override(
                "KLR_LEDGER_PATH",
                state_dir.join("lineage/fitness_ledger.jsonl"),
            ),
            registry_path: path_override(
                "KLR_REGISTRY_PATH",
                state_dir.join("lineage/niche_map.json"),
            ),
            baseline_dir: path_override("KLR_BASELINE_DIR", state_dir.join("baseline")),
            promotions_dir: path_override(
                "KLR_PROMOTIONS_DIR",
                state_dir.join("dream/promotions"),
            ),
            ack_dir: path_override("KLR_ACK_DIR", state_dir.join("dream/promotions_ack")),
            history_path: path_override(
                "KLR_HISTORY_PATH",
                state_dir.join("chembus_history.jsonl"),
            ),
            hmac_key_path: path_override("KLR_HMAC_KEY", state_dir.join("keys/hmac.key")),
            maintenance_flag: path_override(
                "KLR_MAINTENANCE_FLAG",
                state_dir.join("maintenance.flag"),
            ),
            phase_marker_dir: path_override("KLR_PHASE_MARKER_DIR", state_dir.join("phase")),
            log_dir: path_override("KLR_LOG_DIR", state_dir.join("logs")),
            state_dir,
        })
    }
}

/// Whitespace-split command override, e.g. `KLR_DREAM_CMD`.
pub fn command_override(var: &str) -> Option<Vec<String>> {
    let raw = std::env::var(var).ok()?;
    let parts: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    (!parts.is_empty()).then_some(parts)
}

/// Parse `KLR_PHASE_WINDOW` as `HH:MM-HH:MM` local time.
pub fn phase_window() -> Option<klr_orchestrator::PhaseWindow> {
    let raw = std::env::var("KLR_PHASE_WINDOW").ok()?;
    let (start, end) = raw.split_once('-')?;
    let start = chrono::NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = chrono::NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    Some(klr_orchestrator::PhaseWindow::new(start, end))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
