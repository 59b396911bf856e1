// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive process-level file locks.
//!
//! One lock name, one file, one holder. A holder writes its identity
//! as JSON into the lock file and keeps an advisory exclusive lock on
//! the descriptor; stale detection reads the metadata back when an
//! acquisition is rejected. Files stay on disk after release with
//! their last metadata, so reapers can sweep orphans.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lock acquisition errors. `Held` is the structured rejection the
/// caller yields on.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {name} already held by PID {pid}")]
    Held { name: String, pid: u32 },

    #[error("IO error on lock {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Metadata persisted as the lock file's contents (mode 0600).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockMetadata {
    name: String,
    pid: u32,
    hostname: String,
    started_at: f64,
    path: PathBuf,
}

/// An acquired lock. Dropping the handle releases the advisory lock;
/// the file and its last metadata stay behind.
#[derive(Debug)]
pub struct LockHandle {
    pub name: String,
    pub pid: u32,
    pub hostname: String,
    pub started_at: f64,
    pub path: PathBuf,
    // NOTE(lifetime): held to keep the advisory lock; released on drop
    #[allow(dead_code)]
    file: File,
}

/// Directory of lock files, one per lock name.
#[derive(Debug, Clone)]
pub struct LockManager {
    lock_dir: PathBuf,
}

impl LockManager {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
        }
    }

    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.lock_dir.join(format!("{name}.lock"))
    }

    /// Acquire `name` exclusively, non-blocking.
    ///
    /// An existing lock file rejects the acquisition only while its
    /// recorded PID is alive and its age is within `ttl_s`; dead-PID
    /// and aged locks are reaped in place.
    pub fn acquire(&self, name: &str, ttl_s: f64) -> Result<LockHandle, LockError> {
        let io_err = |source| LockError::Io {
            name: name.to_string(),
            source,
        };
        fs::create_dir_all(&self.lock_dir).map_err(io_err)?;

        let path = self.lock_path(name);
        let now = epoch_now();

        if let Some(existing) = read_metadata(&path) {
            let age = now - existing.started_at;
            // Metadata naming our own PID is a lock we previously
            // released (the file outlives the handle); the advisory
            // lock below arbitrates those.
            if existing.pid != std::process::id() && pid_alive(existing.pid) {
                if age <= ttl_s {
                    return Err(LockError::Held {
                        name: name.to_string(),
                        pid: existing.pid,
                    });
                }
                warn!(
                    lock = name,
                    pid = existing.pid,
                    age_s = age as u64,
                    ttl_s = ttl_s as u64,
                    "lock exceeded TTL, reaping",
                );
            } else {
                debug!(lock = name, pid = existing.pid, "reaping lock from dead PID");
            }
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path).map_err(io_err)?;

        if file.try_lock_exclusive().is_err() {
            let pid = read_metadata(&path).map(|m| m.pid).unwrap_or(0);
            return Err(LockError::Held {
                name: name.to_string(),
                pid,
            });
        }

        let metadata = LockMetadata {
            name: name.to_string(),
            pid: std::process::id(),
            hostname: hostname(),
            started_at: now,
            path: path.clone(),
        };

        let payload = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| io_err(std::io::Error::other(e.to_string())))?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        file.set_len(0).map_err(io_err)?;
        file.write_all(&payload).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        info!(lock = name, pid = metadata.pid, "acquired lock");
        Ok(LockHandle {
            name: metadata.name,
            pid: metadata.pid,
            hostname: metadata.hostname,
            started_at: metadata.started_at,
            path,
            file,
        })
    }

    /// Release a handle explicitly. Equivalent to dropping it.
    pub fn release(&self, handle: LockHandle) {
        let name = handle.name.clone();
        if let Err(e) = fs2::FileExt::unlock(&handle.file) {
            warn!(lock = %name, error = %e, "error releasing lock");
        } else {
            info!(lock = %name, "released lock");
        }
        drop(handle);
    }

    /// Sweep orphaned lock files: dead PID or older than `max_age_s`.
    /// Returns the reaped lock names.
    pub fn reap_stale_locks(&self, max_age_s: f64) -> Vec<String> {
        let mut reaped = Vec::new();
        let Ok(entries) = fs::read_dir(&self.lock_dir) else {
            return reaped;
        };
        let now = epoch_now();

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            let Some(metadata) = read_metadata(&path) else {
                continue;
            };

            let age = now - metadata.started_at;
            let alive = pid_alive(metadata.pid);
            if alive && age <= max_age_s {
                continue;
            }

            let reason = if alive {
                format!("age {}s > {}s", age as u64, max_age_s as u64)
            } else {
                "dead process".to_string()
            };
            info!(lock = %metadata.name, pid = metadata.pid, reason = %reason, "reaping stale lock");
            if fs::remove_file(&path).is_ok() {
                reaped.push(metadata.name);
            }
        }

        reaped
    }
}

fn read_metadata(path: &Path) -> Option<LockMetadata> {
    let content = fs::read(path).ok()?;
    serde_json::from_slice(&content).ok()
}

/// Signal 0 probes existence without delivering anything.
fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

fn hostname() -> String {
    nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
