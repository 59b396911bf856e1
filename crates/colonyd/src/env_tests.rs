// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_override_wins() {
    std::env::set_var("KLR_STATE_DIR", "/tmp/klr-test-state");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/klr-test-state"));
    std::env::remove_var("KLR_STATE_DIR");
}

#[test]
#[serial]
fn paths_hang_off_the_state_dir() {
    std::env::set_var("KLR_STATE_DIR", "/tmp/klr-test-state");
    let paths = ColonyPaths::load().unwrap();

    assert_eq!(paths.lock_dir, PathBuf::from("/tmp/klr-test-state/locks"));
    assert_eq!(
        paths.ledger_path,
        PathBuf::from("/tmp/klr-test-state/lineage/fitness_ledger.jsonl"),
    );
    assert_eq!(
        paths.registry_path,
        PathBuf::from("/tmp/klr-test-state/lineage/niche_map.json"),
    );
    std::env::remove_var("KLR_STATE_DIR");
}

#[test]
#[serial]
fn individual_path_overrides_apply() {
    std::env::set_var("KLR_STATE_DIR", "/tmp/klr-test-state");
    std::env::set_var("KLR_LEDGER_PATH", "/elsewhere/ledger.jsonl");
    let paths = ColonyPaths::load().unwrap();

    assert_eq!(paths.ledger_path, PathBuf::from("/elsewhere/ledger.jsonl"));
    assert_eq!(paths.lock_dir, PathBuf::from("/tmp/klr-test-state/locks"));

    std::env::remove_var("KLR_LEDGER_PATH");
    std::env::remove_var("KLR_STATE_DIR");
}

#[test]
#[serial]
fn bus_endpoints_default_to_loopback() {
    std::env::remove_var("KLR_UMN_XSUB");
    std::env::remove_var("KLR_UMN_XPUB");
    let endpoints = bus_endpoints();
    assert_eq!(endpoints.ingress, "tcp://127.0.0.1:5556");
    assert_eq!(endpoints.egress, "tcp://127.0.0.1:5557");
}

#[test]
#[serial]
fn bus_endpoint_overrides_apply() {
    std::env::set_var("KLR_UMN_XSUB", "tcp://127.0.0.1:7001");
    std::env::set_var("KLR_UMN_XPUB", "tcp://127.0.0.1:7002");
    let endpoints = bus_endpoints();
    assert_eq!(endpoints.ingress, "tcp://127.0.0.1:7001");
    assert_eq!(endpoints.egress, "tcp://127.0.0.1:7002");
    std::env::remove_var("KLR_UMN_XSUB");
    std::env::remove_var("KLR_UMN_XPUB");
}

#[test]
#[serial]
fn phase_window_parses_hh_mm_ranges() {
    std::env::set_var("KLR_PHASE_WINDOW", "03:00-04:30");
    let window = phase_window().unwrap();
    assert_eq!(
        window.start,
        chrono::NaiveTime::from_hms_opt(3, 0, 0).unwrap()
    );
    assert_eq!(
        window.end,
        chrono::NaiveTime::from_hms_opt(4, 30, 0).unwrap()
    );

    std::env::set_var("KLR_PHASE_WINDOW", "garbage");
    assert!(phase_window().is_none());
    std::env::remove_var("KLR_PHASE_WINDOW");
}

#[test]
#[serial]
fn command_override_splits_whitespace() {
    std::env::set_var("KLR_DREAM_CMD", "python3 -m dream.runner --epochs 1");
    let expected: Vec<String> = ["python3", "-m", "dream.runner", "--epochs", "1"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(command_override("KLR_DREAM_CMD").unwrap(), expected);

    std::env::set_var("KLR_DREAM_CMD", "   ");
    assert!(command_override("KLR_DREAM_CMD").is_none());
    std::env::remove_var("KLR_DREAM_CMD");
}
