// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger accepts exactly the observations whose HMAC verifies.

use klr_core::{Observation, Signal, SigningKey};
use klr_ledger::{LedgerConfig, LedgerQuery, LedgerWriter};

const NOW: f64 = 1_762_484_000.0;

fn shared_key() -> SigningKey {
    SigningKey::from_bytes(b"colony-shared-key".to_vec())
}

fn observation_signal(obs: &Observation) -> Signal {
    let value = serde_json::to_value(obs).unwrap();
    let facts = value.as_object().unwrap().clone();
    Signal::new("OBSERVATION", obs.ecosystem.clone(), obs.ts).with_facts(facts)
}

#[test]
fn signed_rows_land_and_forgeries_do_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fitness_ledger.jsonl");
    let mut writer = LedgerWriter::new(LedgerConfig::new(&path), shared_key());

    // A properly signed row.
    let mut good = Observation::new(NOW - 10.0, "inc-1", "lat_mon_001", "latency_monitoring", "prod_guard")
        .with_outcome(true)
        .with_ttr_ms(120.0);
    good.sign(&shared_key()).unwrap();
    assert!(writer.ingest(&observation_signal(&good)).unwrap());

    // Signed with the wrong key.
    let mut forged = good.clone();
    forged.sign(&SigningKey::from_bytes(b"wrong-key".to_vec())).unwrap();
    assert!(!writer.ingest(&observation_signal(&forged)).unwrap());

    // Tampered after signing.
    let mut tampered = good.clone();
    tampered.ok = Some(false);
    assert!(!writer.ingest(&observation_signal(&tampered)).unwrap());

    assert_eq!(writer.accepted(), 1);
    assert_eq!(writer.rejected(), 2);

    // The accepted row is visible to queries.
    let query = LedgerQuery::new(&path);
    let summary = query.get_recent_fitness("lat_mon_001", 3600.0, NOW).unwrap();
    assert_eq!(summary.total_incidents, 1);
    assert_eq!(summary.success_rate, 1.0);
}

#[test]
fn queries_span_writer_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fitness_ledger.jsonl");
    let mut writer = LedgerWriter::new(LedgerConfig::new(&path), shared_key());

    for i in 0..10 {
        let mut row = Observation::new(
            NOW - 60.0 - i as f64,
            format!("inc-{i}"),
            "lat_mon_001",
            "latency_monitoring",
            "prod_guard",
        )
        .with_outcome(i % 2 == 0)
        .with_ttr_ms(100.0 + i as f64);
        row.sign(&shared_key()).unwrap();
        assert!(writer.ingest(&observation_signal(&row)).unwrap());
    }

    let query = LedgerQuery::new(&path);
    let summary = query.get_recent_fitness("lat_mon_001", 3600.0, NOW).unwrap();
    assert_eq!(summary.total_incidents, 10);
    assert_eq!(summary.success_rate, 0.5);

    let pressure = query
        .compute_niche_pressure("prod_guard", "latency_monitoring", 3600.0, NOW)
        .unwrap();
    assert!((pressure - (0.5 * 0.7 + 0.1 * 0.3)).abs() < 1e-9);
}
