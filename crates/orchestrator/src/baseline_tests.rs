// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn config(v: u64) -> serde_yaml::Value {
    serde_yaml::from_str(&format!("v: {v}")).unwrap()
}

fn sha_of_archive(manager: &BaselineManager, version: u64) -> String {
    let bytes = fs::read(
        manager
            .versions_dir()
            .join(format!("baseline_v{version:04}.yaml")),
    )
    .unwrap();
    hex::encode(Sha256::digest(&bytes))
}

#[test]
fn first_commit_creates_chain_root() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    let manifest = manager
        .commit_baseline(&config(1), &["p1".to_string()], "kloros-orchestrator", 100.0)
        .unwrap();

    assert_eq!(manifest.version, 1);
    assert_eq!(manifest.previous_sha, "");
    assert_eq!(manifest.promotion_ids, vec!["p1".to_string()]);
    assert!(manager.config_path().exists());
    assert!(manager.manifest_path().exists());
    assert!(dir.path().join("versions/baseline_v0001.yaml").exists());
    assert!(dir.path().join("versions/manifest_v0001.json").exists());
}

#[test]
fn commits_chain_by_sha() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    for v in 1..=3u64 {
        manager
            .commit_baseline(&config(v), &[format!("p{v}")], "actor", 100.0 + v as f64)
            .unwrap();
    }

    let current = manager.get_current_version().unwrap().unwrap();
    assert_eq!(current.version, 3);
    assert_eq!(
        current.previous_sha,
        sha_of_archive(&manager, 2),
        "previous_sha must equal the sha of the v2 baseline",
    );

    assert_eq!(manager.list_versions(), vec![3, 2, 1]);
}

#[test]
fn committed_sha_matches_live_bytes() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    let manifest = manager
        .commit_baseline(&config(7), &[], "actor", 1.0)
        .unwrap();

    let live = fs::read(manager.config_path()).unwrap();
    assert_eq!(manifest.sha256, hex::encode(Sha256::digest(&live)));
}

#[test]
fn rollback_restores_config_and_manifest() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    for v in 1..=3u64 {
        manager
            .commit_baseline(&config(v), &[], "actor", v as f64)
            .unwrap();
    }

    manager.rollback_to_version(2).unwrap();

    let live: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(manager.config_path()).unwrap()).unwrap();
    assert_eq!(live, config(2));

    let manifest = manager.get_current_version().unwrap().unwrap();
    assert_eq!(manifest.version, 2);
}

#[test]
fn rollback_to_missing_version_fails_cleanly() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());
    manager
        .commit_baseline(&config(1), &[], "actor", 1.0)
        .unwrap();

    let before = fs::read(manager.config_path()).unwrap();
    let err = manager.rollback_to_version(9).unwrap_err();
    assert!(matches!(err, CommitError::VersionNotFound(9)));

    // Live files untouched.
    assert_eq!(fs::read(manager.config_path()).unwrap(), before);
}

#[test]
fn archives_are_pruned_to_max_versions() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    for v in 1..=(MAX_VERSIONS as u64 + 5) {
        manager
            .commit_baseline(&config(v), &[], "actor", v as f64)
            .unwrap();
    }

    let versions = manager.list_versions();
    assert_eq!(versions.len(), MAX_VERSIONS);
    assert_eq!(versions[0], MAX_VERSIONS as u64 + 5);
    // The oldest survivors are the newest MAX_VERSIONS.
    assert_eq!(*versions.last().unwrap(), 6);
    assert!(!dir.path().join("versions/baseline_v0001.yaml").exists());
    assert!(!dir.path().join("versions/manifest_v0001.json").exists());
}

#[test]
fn no_temp_files_survive_a_commit() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());
    manager
        .commit_baseline(&config(1), &[], "actor", 1.0)
        .unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn load_config_defaults_to_empty_mapping() {
    let dir = tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());
    let loaded = manager.load_config().unwrap();
    assert_eq!(
        loaded,
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    );
}
