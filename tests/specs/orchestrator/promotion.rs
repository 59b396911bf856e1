// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Promotion accept/reject against the parameter registry.

use klr_orchestrator::promotion::{create_ack, validate_promotion, Ack};
use klr_orchestrator::{ParamBounds, PromotionOutcome};
use serde_json::json;

#[test]
fn in_bounds_promotion_is_acknowledged_accepted() {
    let promo = json!({
        "schema": "v1",
        "id": "p1",
        "timestamp": 1,
        "fitness": 0.8,
        "changes": {"learning_rate": 0.01}
    });

    let outcome = validate_promotion(&promo, &ParamBounds::standard());
    let PromotionOutcome::Accepted(promotion) = outcome else {
        panic!("expected acceptance, got {outcome:?}");
    };

    let dir = tempfile::tempdir().unwrap();
    let ack_path = create_ack(
        dir.path(),
        &promotion.id,
        true,
        "2025-11-07",
        "sha-of-report",
        None,
        100.0,
    )
    .unwrap();

    let ack: Ack = serde_json::from_slice(&std::fs::read(&ack_path).unwrap()).unwrap();
    assert!(ack.accepted);
    assert_eq!(ack.promotion_id, "p1");
    assert!(ack.rejection_reason.is_none());
}

#[test]
fn out_of_bounds_promotion_is_acknowledged_rejected() {
    let promo = json!({
        "schema": "v1",
        "id": "p1",
        "timestamp": 1,
        "fitness": 0.8,
        "changes": {"learning_rate": 0.5}
    });

    let PromotionOutcome::Rejected(reason) = validate_promotion(&promo, &ParamBounds::standard())
    else {
        panic!("expected rejection");
    };
    assert!(reason.contains("maximum"), "reason: {reason}");

    let dir = tempfile::tempdir().unwrap();
    let ack_path = create_ack(
        dir.path(),
        "p1",
        false,
        "2025-11-07",
        "sha-of-report",
        Some(reason),
        100.0,
    )
    .unwrap();

    let ack: Ack = serde_json::from_slice(&std::fs::read(&ack_path).unwrap()).unwrap();
    assert!(!ack.accepted);
    assert!(ack.rejection_reason.unwrap().contains("maximum"));
}
