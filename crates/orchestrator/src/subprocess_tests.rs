// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn captures_stdout_and_exit_code() {
    let result = run_one_shot(
        &argv(&["sh", "-c", "echo out; echo err >&2; exit 3"]),
        None,
        &[],
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(!result.timed_out);
    assert_eq!(result.stdout.trim(), "out");
    assert_eq!(result.stderr.trim(), "err");
}

#[tokio::test]
async fn environment_is_passed_through() {
    let result = run_one_shot(
        &argv(&["sh", "-c", "printf %s \"$KLR_TEST_MARKER\""]),
        None,
        &[("KLR_TEST_MARKER".to_string(), "chem".to_string())],
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "chem");
}

#[tokio::test]
async fn timeout_kills_and_reports_124() {
    let start = std::time::Instant::now();
    let result = run_one_shot(
        &argv(&["sh", "-c", "sleep 30"]),
        None,
        &[],
        Duration::from_millis(300),
    )
    .await
    .unwrap();

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(
        start.elapsed() < Duration::from_secs(15),
        "termination must not wait out the child's sleep",
    );
}

#[tokio::test]
async fn missing_binary_surfaces_an_io_error() {
    let err = run_one_shot(
        &argv(&["definitely-not-a-real-binary-kloros"]),
        None,
        &[],
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[tokio::test]
async fn empty_command_is_rejected() {
    let err = run_one_shot(&[], None, &[], Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empty command"));
}

#[tokio::test]
async fn cwd_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_one_shot(
        &argv(&["sh", "-c", "pwd"]),
        Some(dir.path()),
        &[],
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    let reported = std::path::PathBuf::from(result.stdout.trim());
    assert_eq!(
        reported.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap(),
    );
}
