// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn enter_and_exit_toggle_the_flag_file() {
    let dir = tempdir().unwrap();
    let mode = MaintenanceMode::init(dir.path().join("maintenance.flag"));

    assert!(!mode.is_maintenance());
    mode.enter().unwrap();
    assert!(mode.is_maintenance());
    assert!(mode.flag_path().exists());

    mode.exit().unwrap();
    assert!(!mode.is_maintenance());

    // Exiting twice is harmless.
    mode.exit().unwrap();

    MaintenanceMode::teardown();
}

#[test]
fn current_reflects_init_and_teardown() {
    let dir = tempdir().unwrap();
    MaintenanceMode::init(dir.path().join("flag"));
    assert!(MaintenanceMode::current().is_some());

    MaintenanceMode::teardown();
    assert!(MaintenanceMode::current().is_none());
}

#[tokio::test(start_paused = true)]
async fn wait_returns_immediately_in_normal_mode() {
    let dir = tempdir().unwrap();
    let mode = MaintenanceMode {
        flag_path: dir.path().join("flag"),
    };
    let cancel = CancellationToken::new();

    // No flag: must not block even with time paused.
    mode.wait_for_normal_mode(&cancel).await;
}

#[tokio::test(start_paused = true)]
async fn wait_blocks_until_flag_clears() {
    let dir = tempdir().unwrap();
    let mode = MaintenanceMode {
        flag_path: dir.path().join("flag"),
    };
    mode.enter().unwrap();

    let cancel = CancellationToken::new();
    let flag_path = mode.flag_path().to_path_buf();

    let waiter = async {
        mode.wait_for_normal_mode(&cancel).await;
        true
    };
    let clearer = async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        std::fs::remove_file(&flag_path).unwrap();
        // Give the poll loop one more interval to notice.
        tokio::time::sleep(Duration::from_secs(2)).await;
        false
    };

    let resumed = tokio::select! {
        resumed = waiter => resumed,
        _ = clearer => panic!("waiter should resume after the flag clears"),
    };
    assert!(resumed);
}

#[tokio::test(start_paused = true)]
async fn wait_unblocks_on_cancellation() {
    let dir = tempdir().unwrap();
    let mode = MaintenanceMode {
        flag_path: dir.path().join("flag"),
    };
    mode.enter().unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    // Flag is set but the kill switch wins.
    mode.wait_for_normal_mode(&cancel).await;
}
