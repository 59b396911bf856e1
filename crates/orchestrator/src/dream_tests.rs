// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::tempdir;
use yare::parameterized;

fn dream_config(dir: &tempfile::TempDir, command: &[&str]) -> DreamConfig {
    DreamConfig {
        command: command.iter().map(|s| s.to_string()).collect(),
        cwd: None,
        timeout: Duration::from_secs(10),
        promotions_dir: dir.path().join("promotions"),
        lock_ttl_s: 600.0,
    }
}

#[parameterized(
    generation_word = { "generation: 12", Some(12) },
    gen_colon = { "Gen: 7 complete", Some(7) },
    epoch_word = { "epoch 3 done", Some(3) },
    uppercase = { "GENERATION=42", Some(42) },
    none = { "no numbers of interest here", None },
)]
fn generation_extraction(output: &str, expected: Option<u32>) {
    assert_eq!(extract_generation(output), expected);
}

#[tokio::test]
async fn successful_run_reports_generation_and_promotion() {
    let dir = tempdir().unwrap();
    let promotions = dir.path().join("promotions");
    std::fs::create_dir_all(&promotions).unwrap();
    std::fs::write(promotions.join("p_new.json"), b"{}").unwrap();

    let locks = LockManager::new(dir.path().join("locks"));
    let config = dream_config(&dir, &["sh", "-c", "echo generation: 5"]);

    let result = run_once(&locks, &config, "tag-1".to_string()).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.generation, Some(5));
    assert_eq!(result.run_tag, "tag-1");
    assert_eq!(
        result.promotion_path,
        Some(promotions.join("p_new.json")),
        "freshly written promotion should be discovered",
    );
}

#[tokio::test]
async fn failed_run_reports_exit_code_without_promotion() {
    let dir = tempdir().unwrap();
    let locks = LockManager::new(dir.path().join("locks"));
    let config = dream_config(&dir, &["sh", "-c", "exit 7"]);

    let result = run_once(&locks, &config, "tag-2".to_string()).await.unwrap();

    assert_eq!(result.exit_code, 7);
    assert!(result.generation.is_none());
    assert!(result.promotion_path.is_none());
}

#[tokio::test]
async fn timeout_reports_124() {
    let dir = tempdir().unwrap();
    let locks = LockManager::new(dir.path().join("locks"));
    let mut config = dream_config(&dir, &["sh", "-c", "sleep 30"]);
    config.timeout = Duration::from_millis(200);

    let result = run_once(&locks, &config, "tag-3".to_string()).await.unwrap();
    assert_eq!(result.exit_code, crate::subprocess::TIMEOUT_EXIT_CODE);
}

#[tokio::test]
async fn lock_contention_defers_the_cycle() {
    let dir = tempdir().unwrap();
    let locks = LockManager::new(dir.path().join("locks"));
    let _held = locks.acquire("dream", 600.0).unwrap();

    let config = dream_config(&dir, &["sh", "-c", "echo should not run"]);
    let rejection = run_once(&locks, &config, "tag-4".to_string())
        .await
        .unwrap_err();
    assert!(matches!(rejection, LockError::Held { .. }));
}

#[tokio::test]
async fn lock_is_released_after_the_run() {
    let dir = tempdir().unwrap();
    let locks = LockManager::new(dir.path().join("locks"));
    let config = dream_config(&dir, &["sh", "-c", "true"]);

    run_once(&locks, &config, "tag-5".to_string()).await.unwrap();
    assert!(locks.acquire("dream", 600.0).is_ok());
}
