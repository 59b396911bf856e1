// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot subprocess execution with a hard timeout.
//!
//! Timed-out jobs get SIGTERM, a grace period, then SIGKILL, and
//! report the conventional timeout exit code 124. Side effects of a
//! timed-out job are never committed by callers.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{error, warn};

/// Conventional exit code for a killed-on-timeout subprocess.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Grace between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Outcome of a one-shot run.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_s: f64,
    pub timed_out: bool,
}

/// Run `command` to completion or `timeout`, whichever comes first.
pub async fn run_one_shot(
    command: &[String],
    cwd: Option<&Path>,
    envs: &[(String, String)],
    timeout: Duration,
) -> std::io::Result<SubprocessResult> {
    let Some((program, args)) = command.split_first() else {
        return Err(std::io::Error::other("empty command"));
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    // Drain pipes concurrently so a chatty child never blocks on a
    // full pipe while we wait on it.
    let stdout_task = child.stdout.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf).await;
            buf
        })
    });
    let stderr_task = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf).await;
            buf
        })
    });

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => Some(status?),
        Err(_) => {
            warn!(program = %program, timeout_s = timeout.as_secs(), "subprocess timeout, terminating");
            terminate(&mut child).await;
            None
        }
    };

    let stdout = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    let duration_s = start.elapsed().as_secs_f64();

    match status {
        Some(status) => Ok(SubprocessResult {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
            duration_s,
            timed_out: false,
        }),
        None => Ok(SubprocessResult {
            exit_code: TIMEOUT_EXIT_CODE,
            stdout,
            stderr,
            duration_s,
            timed_out: true,
        }),
    }
}

/// SIGTERM, wait out the grace period, then SIGKILL.
async fn terminate(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        if let Ok(pid) = i32::try_from(pid) {
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid),
                nix::sys::signal::Signal::SIGTERM,
            );
        }
    }

    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        error!("subprocess ignored SIGTERM, killing");
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
