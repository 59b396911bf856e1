// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic baseline configuration commits.
//!
//! The live config is `baseline.yaml`; each commit chains to the
//! previous by SHA-256 through `manifest.json`. Both files go through
//! temp + fsync + rename, so a failed commit leaves the prior live
//! files intact. Every committed version is archived under
//! `versions/` and pruned to the newest [`MAX_VERSIONS`].

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

/// Archived versions retained after pruning.
pub const MAX_VERSIONS: usize = 10;

/// Commit/rollback failures. The live files are untouched when these
/// surface.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("version {0} not found in archives")]
    VersionNotFound(u64),
}

/// Baseline version manifest with chain tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineManifest {
    pub version: u64,
    pub sha256: String,
    pub previous_sha: String,
    pub ts: f64,
    pub actor: String,
    pub promotion_ids: Vec<String>,
}

/// Manages `baseline.yaml`, `manifest.json`, and the versions archive.
#[derive(Debug, Clone)]
pub struct BaselineManager {
    base_dir: PathBuf,
}

impl BaselineManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join("baseline.yaml")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join("manifest.json")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.base_dir.join("versions")
    }

    fn archive_config_path(&self, version: u64) -> PathBuf {
        self.versions_dir().join(format!("baseline_v{version:04}.yaml"))
    }

    fn archive_manifest_path(&self, version: u64) -> PathBuf {
        self.versions_dir().join(format!("manifest_v{version:04}.json"))
    }

    /// Load the live baseline config, or an empty mapping when absent.
    pub fn load_config(&self) -> Result<serde_yaml::Value, CommitError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Atomically commit a new baseline.
    ///
    /// Steps: load the previous manifest (or a zeroed one), write the
    /// config via temp + fsync + rename, hash the committed bytes,
    /// commit the chained manifest the same way, archive both, prune.
    pub fn commit_baseline(
        &self,
        new_config: &serde_yaml::Value,
        promotion_ids: &[String],
        actor: &str,
        now: f64,
    ) -> Result<BaselineManifest, CommitError> {
        fs::create_dir_all(&self.base_dir)?;
        fs::create_dir_all(self.versions_dir())?;

        let previous = self.get_current_version()?.unwrap_or_default();
        let version = previous.version + 1;

        // 1. Config: temp + fsync + rename. Any failure deletes the
        // temp and leaves the live file as it was.
        let config_path = self.config_path();
        let tmp_path = config_path.with_extension("tmp");
        let committed_bytes = match write_config_tmp(&tmp_path, new_config) {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&tmp_path, &config_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        let sha256 = hex::encode(Sha256::digest(&committed_bytes));
        info!(version, sha = %&sha256[..12], "committed baseline");

        // 2. Manifest, chained to the previous hash.
        let manifest = BaselineManifest {
            version,
            sha256,
            previous_sha: previous.sha256,
            ts: now,
            actor: actor.to_string(),
            promotion_ids: promotion_ids.to_vec(),
        };
        let manifest_path = self.manifest_path();
        let manifest_tmp = manifest_path.with_extension("tmp");
        if let Err(e) = write_manifest_tmp(&manifest_tmp, &manifest) {
            let _ = fs::remove_file(&manifest_tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&manifest_tmp, &manifest_path) {
            let _ = fs::remove_file(&manifest_tmp);
            return Err(e.into());
        }

        // 3. Archive both files; archiving is best-effort once the
        // live commit landed.
        if let Err(e) = fs::copy(&config_path, self.archive_config_path(version))
            .and_then(|_| fs::copy(&manifest_path, self.archive_manifest_path(version)))
        {
            warn!(version, error = %e, "failed to archive baseline version");
        }

        self.prune_old_versions();

        Ok(manifest)
    }

    /// Restore both the config and manifest from a version's archives.
    pub fn rollback_to_version(&self, version: u64) -> Result<(), CommitError> {
        let config_archive = self.archive_config_path(version);
        let manifest_archive = self.archive_manifest_path(version);
        if !config_archive.exists() || !manifest_archive.exists() {
            return Err(CommitError::VersionNotFound(version));
        }

        restore_atomic(&config_archive, &self.config_path())?;
        restore_atomic(&manifest_archive, &self.manifest_path())?;

        info!(version, "rolled back baseline");
        Ok(())
    }

    /// Current manifest, if a baseline has ever been committed.
    pub fn get_current_version(&self) -> Result<Option<BaselineManifest>, CommitError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read(&path)?;
        match serde_json::from_slice(&content) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                warn!(error = %e, "unreadable manifest");
                Ok(None)
            }
        }
    }

    /// Archived versions, newest first.
    pub fn list_versions(&self) -> Vec<u64> {
        let mut versions: Vec<u64> = Vec::new();
        let Ok(entries) = fs::read_dir(self.versions_dir()) else {
            return versions;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_prefix("baseline_v") else {
                continue;
            };
            let Some(stem) = stem.strip_suffix(".yaml") else {
                continue;
            };
            if let Ok(version) = stem.parse::<u64>() {
                versions.push(version);
            }
        }
        versions.sort_unstable_by(|a, b| b.cmp(a));
        versions
    }

    /// Keep only the newest [`MAX_VERSIONS`] archives.
    fn prune_old_versions(&self) {
        let versions = self.list_versions();
        for version in versions.into_iter().skip(MAX_VERSIONS) {
            let _ = fs::remove_file(self.archive_config_path(version));
            let _ = fs::remove_file(self.archive_manifest_path(version));
            info!(version, "pruned old baseline version");
        }
    }
}

fn write_config_tmp(tmp_path: &Path, config: &serde_yaml::Value) -> Result<Vec<u8>, CommitError> {
    let serialized = serde_yaml::to_string(config)?;
    let mut file = File::create(tmp_path)?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(serialized.into_bytes())
}

fn write_manifest_tmp(tmp_path: &Path, manifest: &BaselineManifest) -> Result<(), CommitError> {
    let serialized = serde_json::to_vec_pretty(manifest)?;
    let mut file = File::create(tmp_path)?;
    file.write_all(&serialized)?;
    file.sync_all()?;
    Ok(())
}

/// Copy an archive over a live file via temp + rename.
fn restore_atomic(archive: &Path, live: &Path) -> Result<(), CommitError> {
    let tmp = live.with_extension("restore.tmp");
    if let Err(e) = fs::copy(archive, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, live) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "baseline_tests.rs"]
mod tests;
