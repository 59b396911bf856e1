// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At most one holder per lock name; stale locks are always reapable.

use klr_orchestrator::{LockError, LockManager};

#[test]
fn at_most_one_holder_per_name() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::new(dir.path());

    let held = manager.acquire("orchestrator", 600.0).unwrap();

    match manager.acquire("orchestrator", 600.0) {
        Err(LockError::Held { name, pid }) => {
            assert_eq!(name, "orchestrator");
            assert_eq!(pid, std::process::id());
        }
        other => panic!("expected structured rejection, got {other:?}"),
    }

    manager.release(held);
    assert!(manager.acquire("orchestrator", 600.0).is_ok());
}

#[test]
fn stale_locks_are_always_reapable() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::new(dir.path());

    // Forge a lock file from a process that no longer exists.
    std::fs::create_dir_all(dir.path()).unwrap();
    let metadata = serde_json::json!({
        "name": "dream",
        "pid": 4_000_000u32,
        "hostname": "elsewhere",
        "started_at": 1.0,
        "path": manager.lock_path("dream"),
    });
    std::fs::write(
        manager.lock_path("dream"),
        serde_json::to_vec_pretty(&metadata).unwrap(),
    )
    .unwrap();

    let reaped = manager.reap_stale_locks(3600.0);
    assert_eq!(reaped, vec!["dream".to_string()]);
    assert!(!manager.lock_path("dream").exists());

    // And acquisition over a stale file succeeds directly too.
    std::fs::write(
        manager.lock_path("phase"),
        serde_json::to_vec_pretty(&serde_json::json!({
            "name": "phase",
            "pid": 4_000_000u32,
            "hostname": "elsewhere",
            "started_at": 1.0,
            "path": manager.lock_path("phase"),
        }))
        .unwrap(),
    )
    .unwrap();
    assert!(manager.acquire("phase", 600.0).is_ok());
}
