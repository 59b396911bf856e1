// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Baseline commits chain by SHA; rollback restores archives.

use klr_orchestrator::{BaselineManager, MAX_VERSIONS};
use sha2::{Digest, Sha256};

fn config(v: u64) -> serde_yaml::Value {
    serde_yaml::from_str(&format!("v: {v}")).unwrap()
}

#[test]
fn three_commits_chain_and_roll_back() {
    let dir = tempfile::tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    for v in 1..=3u64 {
        manager
            .commit_baseline(&config(v), &[format!("p{v}")], "kloros-orchestrator", v as f64)
            .unwrap();
    }

    for v in 1..=3u64 {
        assert!(dir
            .path()
            .join(format!("versions/baseline_v{v:04}.yaml"))
            .exists());
    }

    let current = manager.get_current_version().unwrap().unwrap();
    assert_eq!(current.version, 3);

    let v2_bytes = std::fs::read(dir.path().join("versions/baseline_v0002.yaml")).unwrap();
    assert_eq!(current.previous_sha, hex::encode(Sha256::digest(&v2_bytes)));

    manager.rollback_to_version(2).unwrap();
    let live: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(manager.config_path()).unwrap()).unwrap();
    assert_eq!(live, config(2));
    assert_eq!(manager.get_current_version().unwrap().unwrap().version, 2);
}

#[test]
fn archive_count_never_exceeds_max_versions() {
    let dir = tempfile::tempdir().unwrap();
    let manager = BaselineManager::new(dir.path());

    for v in 1..=(MAX_VERSIONS as u64 * 2) {
        manager
            .commit_baseline(&config(v), &[], "actor", v as f64)
            .unwrap();
        assert!(
            manager.list_versions().len() <= MAX_VERSIONS,
            "rotation bound violated after commit {v}",
        );
    }
}
