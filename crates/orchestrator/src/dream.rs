// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dream (evolution) one-shot trigger.
//!
//! Runs one evolution cycle under the `dream` lock with a hard
//! timeout. The cycle's promotions land as files for the next
//! orchestrator tick; nothing here commits them.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{error, info};

use crate::locks::{LockError, LockHandle, LockManager};
use crate::subprocess::{run_one_shot, SubprocessResult};

/// Default hard timeout for a dream cycle.
pub const DEFAULT_DREAM_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How a dream cycle is launched.
#[derive(Debug, Clone)]
pub struct DreamConfig {
    /// Full argv of the external runner.
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    /// Where the runner drops promotion files.
    pub promotions_dir: PathBuf,
    pub lock_ttl_s: f64,
}

/// Result of one dream cycle.
#[derive(Debug, Clone)]
pub struct DreamResult {
    pub exit_code: i32,
    pub generation: Option<u32>,
    pub promotion_path: Option<PathBuf>,
    pub run_tag: String,
    pub duration_s: f64,
}

/// Acquire the `dream` lock and run one cycle to completion.
pub async fn run_once(
    locks: &LockManager,
    config: &DreamConfig,
    run_tag: String,
) -> Result<DreamResult, LockError> {
    let handle = locks.acquire("dream", config.lock_ttl_s)?;
    Ok(run_locked(handle, config.clone(), run_tag).await)
}

/// Run a cycle under an already-acquired lock handle. The handle is
/// released when the subprocess finishes.
pub async fn run_locked(handle: LockHandle, config: DreamConfig, run_tag: String) -> DreamResult {
    info!(run_tag = %run_tag, timeout_s = config.timeout.as_secs(), "starting dream one-shot");

    let envs = vec![(
        crate::env::ORCHESTRATION_MODE.to_string(),
        "enabled".to_string(),
    )];
    let outcome = run_one_shot(
        &config.command,
        config.cwd.as_deref(),
        &envs,
        config.timeout,
    )
    .await;

    let result = match outcome {
        Ok(run) => finish(&config, &run_tag, run),
        Err(e) => {
            error!(error = %e, "dream execution error");
            DreamResult {
                exit_code: 1,
                generation: None,
                promotion_path: None,
                run_tag,
                duration_s: 0.0,
            }
        }
    };

    drop(handle);
    result
}

fn finish(config: &DreamConfig, run_tag: &str, run: SubprocessResult) -> DreamResult {
    if run.timed_out {
        error!(run_tag = %run_tag, "dream timed out");
        return DreamResult {
            exit_code: run.exit_code,
            generation: None,
            promotion_path: None,
            run_tag: run_tag.to_string(),
            duration_s: run.duration_s,
        };
    }

    if run.exit_code != 0 {
        error!(run_tag = %run_tag, exit_code = run.exit_code, "dream failed");
        error!(stderr = %run.stderr, "dream stderr");
        return DreamResult {
            exit_code: run.exit_code,
            generation: None,
            promotion_path: None,
            run_tag: run_tag.to_string(),
            duration_s: run.duration_s,
        };
    }

    let generation = extract_generation(&run.stdout).or_else(|| extract_generation(&run.stderr));
    let promotion_path = find_latest_promotion(&config.promotions_dir);

    info!(
        run_tag = %run_tag,
        duration_s = run.duration_s as u64,
        generation,
        "dream one-shot completed",
    );

    DreamResult {
        exit_code: 0,
        generation,
        promotion_path,
        run_tag: run_tag.to_string(),
        duration_s: run.duration_s,
    }
}

/// First integer following a generation/epoch marker in the output.
fn extract_generation(output: &str) -> Option<u32> {
    let lowered = output.to_lowercase();
    for marker in ["generation", "gen:", "epoch"] {
        let mut rest = lowered.as_str();
        while let Some(idx) = rest.find(marker) {
            rest = &rest[idx + marker.len()..];
            let candidate = rest.trim_start_matches([':', '=', ' ', '\t']);
            let digits: String = candidate
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !digits.is_empty() {
                return digits.parse().ok();
            }
        }
    }
    None
}

/// Newest promotion file written in the last minute.
fn find_latest_promotion(promotions_dir: &PathBuf) -> Option<PathBuf> {
    let entries = std::fs::read_dir(promotions_dir).ok()?;
    let cutoff = SystemTime::now() - Duration::from_secs(60);

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .filter_map(|path| {
            let modified = path.metadata().ok()?.modified().ok()?;
            (modified > cutoff).then_some((path, modified))
        })
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path)
}

#[cfg(test)]
#[path = "dream_tests.rs"]
mod tests;
