// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unset orchestration mode disables ticks entirely.

use klr_orchestrator::{Orchestrator, OrchestratorConfig, ParamBounds, TickOutcome};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn tick_is_disabled_without_the_mode_flag() {
    std::env::remove_var("KLR_ORCHESTRATION_MODE");

    let dir = tempfile::tempdir().unwrap();
    let config = OrchestratorConfig {
        lock_dir: dir.path().join("locks"),
        baseline_dir: dir.path().join("baseline"),
        promotions_dir: dir.path().join("promotions"),
        ack_dir: dir.path().join("acks"),
        bounds: ParamBounds::standard(),
        phase: None,
        dream: None,
        lock_ttl_s: 600.0,
        actor: "kloros-orchestrator".to_string(),
    };
    let orchestrator = Orchestrator::new(config);

    let outcome = orchestrator.tick().await;
    assert_eq!(outcome, TickOutcome::Disabled);
    assert_eq!(outcome.to_string(), "DISABLED");

    // No lock or file was touched.
    assert!(!dir.path().join("locks").exists());
    assert!(!dir.path().join("baseline").exists());
    assert!(!dir.path().join("acks").exists());
}
