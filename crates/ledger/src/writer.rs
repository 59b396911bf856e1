// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger writer.
//!
//! Owns the ledger file exclusively. Ingests OBSERVATION signals,
//! verifies the row signature against the shared key, and appends the
//! canonical JSON line. Bad signatures are dropped silently into a
//! rejected counter.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use klr_core::{to_canonical_json, Observation, Signal, SigningKey};
use tracing::{debug, info};

use crate::LedgerError;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Ledger JSONL path.
    pub path: PathBuf,
    /// Rotation threshold in bytes.
    pub max_size_bytes: u64,
    /// Lines kept in place when rotating.
    pub keep_lines: usize,
}

impl LedgerConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: 50 * 1024 * 1024,
            keep_lines: 100_000,
        }
    }
}

/// The single ledger writer.
pub struct LedgerWriter {
    config: LedgerConfig,
    key: SigningKey,
    accepted: u64,
    rejected: u64,
}

impl LedgerWriter {
    pub fn new(config: LedgerConfig, key: SigningKey) -> Self {
        Self {
            config,
            key,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Observations dropped for failing signature verification.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Ingest one OBSERVATION signal.
    ///
    /// Returns `true` when the row was appended, `false` when it was
    /// rejected (unparseable facts or bad signature). Only real I/O
    /// failures surface as errors.
    pub fn ingest(&mut self, signal: &Signal) -> Result<bool, LedgerError> {
        let observation = match Observation::from_facts(&signal.facts) {
            Ok(row) => row,
            Err(e) => {
                self.rejected += 1;
                debug!(error = %e, "rejecting observation with unparseable facts");
                return Ok(false);
            }
        };

        if !observation.verify(&self.key) {
            self.rejected += 1;
            debug!(zooid = %observation.zooid, "rejecting observation with bad signature");
            return Ok(false);
        }

        self.append(&observation)?;
        Ok(true)
    }

    /// Append a verified row and rotate when past the size bound.
    fn append(&mut self, observation: &Observation) -> Result<(), LedgerError> {
        if let Some(parent) = self.config.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = to_canonical_json(observation)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        self.accepted += 1;

        let size = file.metadata()?.len();
        drop(file);
        if size > self.config.max_size_bytes {
            self.rotate()?;
        }

        Ok(())
    }

    fn rotate(&mut self) -> Result<(), LedgerError> {
        if let Some(rotation) = rotate_tail(&self.config.path, self.config.keep_lines)? {
            info!(
                kept_bytes = rotation.kept_bytes,
                rotated_bytes = rotation.rotated_bytes,
                old = %rotation.old_path.display(),
                "ledger rotated",
            );
        }
        Ok(())
    }
}

/// Outcome of a [`rotate_tail`] pass that actually moved content.
#[derive(Debug, Clone)]
pub struct TailRotation {
    pub kept_bytes: u64,
    pub rotated_bytes: u64,
    pub old_path: PathBuf,
}

/// Tail-keep rotation for JSONL files, shared by every keeper (the
/// ledger itself and the historian's history file).
///
/// The newest `keep_lines` lines stay in place; everything older moves
/// to `<file>.old` (replacing a previous `.old`). The kept tail is
/// written to a temp file, fsynced, and renamed over the live path.
/// Returns `None` when the file already fits in the keep window.
pub fn rotate_tail(
    path: &std::path::Path,
    keep_lines: usize,
) -> Result<Option<TailRotation>, LedgerError> {
    let size = fs::metadata(path)?.len();
    let offset = tail_offset(path, keep_lines)?;
    if offset == 0 {
        // Everything fits in the keep window; nothing to move out.
        return Ok(None);
    }

    let mut tail = Vec::new();
    {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_to_end(&mut tail)?;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ledger.jsonl".to_string());
    let old_path = path.with_file_name(format!("{name}.old"));
    if old_path.exists() {
        fs::remove_file(&old_path)?;
    }
    fs::rename(path, &old_path)?;

    let tmp_path = path.with_file_name(format!("{name}.tmp"));
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&tail)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(Some(TailRotation {
        kept_bytes: tail.len() as u64,
        rotated_bytes: size - tail.len() as u64,
        old_path,
    }))
}

/// Byte offset of the start of the last `keep_lines` lines.
///
/// Scans backwards in fixed blocks counting newlines; returns 0 when
/// the file holds fewer lines than the keep window.
pub fn tail_offset(path: &std::path::Path, keep_lines: usize) -> Result<u64, LedgerError> {
    const BLOCK: u64 = 64 * 1024;

    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if size == 0 {
        return Ok(0);
    }

    // A trailing newline terminates the last line; ignore it while
    // counting line starts.
    let mut newlines_seen = 0usize;
    let mut pos = size;
    let mut buf = vec![0u8; BLOCK as usize];

    while pos > 0 {
        let read_len = BLOCK.min(pos);
        pos -= read_len;
        file.seek(SeekFrom::Start(pos))?;
        let chunk = &mut buf[..read_len as usize];
        file.read_exact(chunk)?;

        for (i, byte) in chunk.iter().enumerate().rev() {
            if *byte != b'\n' {
                continue;
            }
            let absolute = pos + i as u64;
            if absolute == size - 1 {
                continue;
            }
            newlines_seen += 1;
            if newlines_seen == keep_lines {
                // The line after this newline is the first kept line.
                return Ok(absolute + 1);
            }
        }
    }

    Ok(0)
}

impl std::fmt::Debug for LedgerWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerWriter")
            .field("path", &self.config.path)
            .field("accepted", &self.accepted)
            .field("rejected", &self.rejected)
            .finish()
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
