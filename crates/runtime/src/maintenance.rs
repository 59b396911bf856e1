// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide maintenance gate.
//!
//! Orchestration windows pause the colony by touching a flag file; the
//! gate blocks every worker's dispatch loop until the flag clears.
//! The service is an explicit-init singleton — flags are not scattered
//! through the codebase, and because the flag lives on disk the gate
//! holds across every process on the host.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

static CURRENT: RwLock<Option<Arc<MaintenanceMode>>> = RwLock::new(None);

/// Poll interval while the maintenance flag is set.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The maintenance-mode service.
#[derive(Debug)]
pub struct MaintenanceMode {
    flag_path: PathBuf,
}

impl MaintenanceMode {
    /// Install the process-wide instance. Re-initializing replaces the
    /// previous instance (used by tests).
    pub fn init(flag_path: impl Into<PathBuf>) -> Arc<Self> {
        let mode = Arc::new(Self {
            flag_path: flag_path.into(),
        });
        *CURRENT.write() = Some(Arc::clone(&mode));
        mode
    }

    /// Remove the process-wide instance.
    pub fn teardown() {
        *CURRENT.write() = None;
    }

    /// The installed instance, if any. Workers treat "not initialized"
    /// as "never in maintenance".
    pub fn current() -> Option<Arc<Self>> {
        CURRENT.read().clone()
    }

    pub fn flag_path(&self) -> &Path {
        &self.flag_path
    }

    /// Whether the colony is currently paused.
    pub fn is_maintenance(&self) -> bool {
        self.flag_path.exists()
    }

    /// Enter maintenance by touching the flag file.
    pub fn enter(&self) -> std::io::Result<()> {
        if let Some(parent) = self.flag_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.flag_path, b"maintenance\n")?;
        info!(flag = %self.flag_path.display(), "maintenance mode entered");
        Ok(())
    }

    /// Leave maintenance by removing the flag file.
    pub fn exit(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.flag_path) {
            Ok(()) => {
                info!(flag = %self.flag_path.display(), "maintenance mode exited");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Block until the flag clears or `cancel` fires.
    pub async fn wait_for_normal_mode(&self, cancel: &CancellationToken) {
        let mut announced = false;
        while self.is_maintenance() {
            if !announced {
                warn!(flag = %self.flag_path.display(), "paused for maintenance window");
                announced = true;
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
        if announced {
            info!("maintenance window over, resuming");
        }
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
