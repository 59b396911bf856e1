// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry persistence: snapshot-then-atomic-write.
//!
//! The rename is the only observable state change; readers see either
//! the full previous document or the full new one. Every committed
//! version is archived next to the live file as `<stem>.v{N}.json`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::Registry;

/// Errors from registry persistence.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry path {0} has no parent directory")]
    NoParent(PathBuf),
}

/// Handle on the registry file.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry; an absent file yields a well-formed empty
    /// registry at version 0. A corrupt file is rotated to `.bak` and
    /// treated as absent so the colony can be rebuilt from archives.
    pub fn load(&self) -> Result<Registry, RegistryError> {
        if !self.path.exists() {
            return Ok(Registry::empty());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(registry) => Ok(registry),
            Err(e) => {
                let bak = self.path.with_extension("bak");
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    bak = %bak.display(),
                    "corrupt registry, moving to .bak and starting empty",
                );
                fs::rename(&self.path, &bak)?;
                Ok(Registry::empty())
            }
        }
    }

    /// Commit the registry: bump the version, write to a temp file in
    /// the same directory, fsync, rename over the live file, then
    /// archive the committed bytes as `<stem>.v{version}.json`.
    ///
    /// The first commit of an empty registry produces archive `.v1`.
    pub fn snapshot_then_atomic_write(&self, registry: &mut Registry) -> Result<(), RegistryError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| RegistryError::NoParent(self.path.clone()))?;
        fs::create_dir_all(parent)?;

        registry.version += 1;

        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, registry)?;
            writer.write_all(b"\n")?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let archive = self.archive_path(registry.version);
        if let Err(e) = fs::copy(&self.path, &archive) {
            // The live commit already happened; archiving is best-effort.
            warn!(
                version = registry.version,
                archive = %archive.display(),
                error = %e,
                "failed to archive registry version",
            );
        } else {
            info!(
                version = registry.version,
                zooids = registry.zooids.len(),
                "registry committed",
            );
        }

        Ok(())
    }

    /// Archive path for a given version, e.g. `niche_map.v3.json`.
    fn archive_path(&self, version: u64) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "registry".to_string());
        self.path.with_file_name(format!("{stem}.v{version}.json"))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
