// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One async entry point per colony role.
//!
//! Worker roles build a [`ZooidRuntime`] and hand it a concrete zooid;
//! control-plane roles (proxy, orchestrator, intent router,
//! quarantine) run their own loops. All of them stop on the shared
//! cancellation token, which `main` wires to SIGTERM/SIGINT.

use std::time::Duration;

use anyhow::Context;
use klr_bus::{SignalProxy, SignalPublisher};
use klr_core::{topics, Clock, IdGen, SigningKey, SystemClock, UuidIdGen};
use klr_ledger::{LedgerConfig, LedgerQuery, LedgerWriter};
use klr_orchestrator::{DreamConfig, Orchestrator, OrchestratorConfig, ParamBounds, PhaseConfig};
use klr_registry::{QuarantineConfig, RegistryStore};
use klr_runtime::workers::{
    BackpressureBalancer, Historian, HistorianConfig, LatencyTracker, LedgerWriterZooid,
    QuarantineSweeper,
};
use klr_runtime::{DedupePolicy, MaintenanceMode, Zooid, ZooidConfig, ZooidRuntime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::env::{self, ColonyPaths};

/// Default dream-cycle timeout (30 minutes, like the runner expects).
const DREAM_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const PHASE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const LOCK_TTL_S: f64 = 600.0;

/// Run the bus proxy until cancelled.
pub async fn proxy(cancel: CancellationToken) -> anyhow::Result<()> {
    let proxy = SignalProxy::new(env::bus_endpoints());
    let shutdown = proxy.shutdown_token();
    let forward = tokio::spawn(async move { proxy.run().await });

    cancel.cancelled().await;
    shutdown.cancel();
    forward.await.context("proxy task panicked")??;
    Ok(())
}

/// Run orchestrator ticks on an interval, reaping stale locks hourly.
pub async fn orchestrator(
    paths: &ColonyPaths,
    interval_s: u64,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(orchestrator_config(paths));
    let mut tick = tokio::time::interval(Duration::from_secs(interval_s.max(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut reap = tokio::time::interval(Duration::from_secs(3600));
    reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("orchestrator stopping");
                return Ok(());
            }
            _ = reap.tick() => {
                let reaped = orchestrator.locks().reap_stale_locks(3600.0);
                if !reaped.is_empty() {
                    info!(reaped = ?reaped, "swept stale locks");
                }
            }
            _ = tick.tick() => {
                let outcome = orchestrator.tick().await;
                info!(outcome = %outcome, "tick");
            }
        }
    }
}

/// One orchestrator tick; prints the outcome string for one-shot use.
pub async fn tick_once(paths: &ColonyPaths) -> anyhow::Result<String> {
    let orchestrator = Orchestrator::new(orchestrator_config(paths));
    Ok(orchestrator.tick().await.to_string())
}

/// Restore a baseline version from the archives.
pub fn rollback(paths: &ColonyPaths, version: u64) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(orchestrator_config(paths));
    orchestrator
        .baseline()
        .rollback_to_version(version)
        .with_context(|| format!("rollback to version {version} failed"))
}

fn orchestrator_config(paths: &ColonyPaths) -> OrchestratorConfig {
    let dream = env::command_override("KLR_DREAM_CMD").map(|command| DreamConfig {
        command,
        cwd: None,
        timeout: DREAM_TIMEOUT,
        promotions_dir: paths.promotions_dir.clone(),
        lock_ttl_s: LOCK_TTL_S,
    });

    let phase = match (env::phase_window(), env::command_override("KLR_PHASE_CMD")) {
        (Some(window), Some(command)) => Some(PhaseConfig {
            window,
            command,
            cwd: None,
            timeout: PHASE_TIMEOUT,
            marker_dir: paths.phase_marker_dir.clone(),
        }),
        _ => None,
    };

    OrchestratorConfig {
        lock_dir: paths.lock_dir.clone(),
        baseline_dir: paths.baseline_dir.clone(),
        promotions_dir: paths.promotions_dir.clone(),
        ack_dir: paths.ack_dir.clone(),
        bounds: ParamBounds::standard(),
        phase,
        dream,
        lock_ttl_s: LOCK_TTL_S,
        actor: "kloros-orchestrator".to_string(),
    }
}

/// Scan the intent directory on an interval.
pub async fn intent_router(
    paths: &ColonyPaths,
    interval_s: u64,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let router = klr_orchestrator::IntentRouter::new(
        &paths.intent_dir,
        &paths.dlq_path,
        klr_orchestrator::env::chem_enabled(),
    );
    let mut publisher = SignalPublisher::new(env::bus_endpoints().ingress);
    let clock = SystemClock;
    let mut scan = tokio::time::interval(Duration::from_secs(interval_s.max(1)));
    scan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("intent router stopping");
                return Ok(());
            }
            _ = scan.tick() => {
                match router.scan_once(&mut publisher, clock.now()).await {
                    Ok(stats) if stats.routed + stats.dead_lettered + stats.ignored > 0 => {
                        info!(
                            routed = stats.routed,
                            dead_lettered = stats.dead_lettered,
                            ignored = stats.ignored,
                            "intent scan",
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "intent scan failed"),
                }
            }
        }
    }
}

/// Run the quarantine sweeper on an interval.
pub async fn quarantine(
    paths: &ColonyPaths,
    interval_s: u64,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    MaintenanceMode::init(&paths.maintenance_flag);

    let sweeper = QuarantineSweeper::new(
        RegistryStore::new(&paths.registry_path),
        LedgerQuery::new(&paths.ledger_path),
        QuarantineConfig::default(),
        Duration::from_secs(interval_s.max(1)),
        Box::new(stop_service),
        Box::new(|event| info!(summary = %event.log_summary(), "state change")),
    )
    .with_locks(klr_orchestrator::LockManager::new(&paths.lock_dir));
    sweeper.run(cancel).await;
    Ok(())
}

/// Run one dream cycle synchronously; the caller gets the cycle's
/// exit code (124 on timeout).
pub async fn dream_once(paths: &ColonyPaths) -> anyhow::Result<i32> {
    let Some(command) = env::command_override("KLR_DREAM_CMD") else {
        anyhow::bail!("KLR_DREAM_CMD is not set");
    };

    let config = DreamConfig {
        command,
        cwd: None,
        timeout: DREAM_TIMEOUT,
        promotions_dir: paths.promotions_dir.clone(),
        lock_ttl_s: LOCK_TTL_S,
    };
    let locks = klr_orchestrator::LockManager::new(&paths.lock_dir);
    let run_tag = UuidIdGen.run_tag(SystemClock.now());

    let result = klr_orchestrator::dream::run_once(&locks, &config, run_tag)
        .await
        .context("dream lock unavailable")?;
    info!(
        exit_code = result.exit_code,
        generation = result.generation,
        promotion = ?result.promotion_path,
        "dream one-shot finished",
    );
    Ok(result.exit_code)
}

/// Stop a demoted zooid's unit. Best-effort; failures are logged.
fn stop_service(name: &str) {
    let unit = format!("kloros-zooid@{name}.service");
    match std::process::Command::new("systemctl")
        .args(["stop", &unit])
        .status()
    {
        Ok(status) if status.success() => info!(unit = %unit, "stopped service"),
        Ok(status) => warn!(unit = %unit, code = ?status.code(), "systemctl stop failed"),
        Err(e) => warn!(unit = %unit, error = %e, "could not invoke systemctl"),
    }
}

/// Shared worker-role scaffolding: maintenance gate, runtime, kill
/// switch wiring.
async fn run_zooid<Z: Zooid + 'static>(
    paths: &ColonyPaths,
    config: ZooidConfig,
    zooid: Z,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    MaintenanceMode::init(&paths.maintenance_flag);

    let runtime = ZooidRuntime::new(config);
    let kill = runtime.kill_switch();
    tokio::spawn(async move {
        cancel.cancelled().await;
        kill.cancel();
    });

    runtime.run(zooid).await;
    Ok(())
}

/// The ledger writer worker.
pub async fn ledger_writer(paths: &ColonyPaths, cancel: CancellationToken) -> anyhow::Result<()> {
    let key = SigningKey::load(&paths.hmac_key_path)
        .with_context(|| format!("loading HMAC key from {}", paths.hmac_key_path.display()))?;

    let config = ZooidConfig::new(
        "ledger_writer",
        "observability",
        "colony",
        vec![topics::OBSERVATION.to_string()],
        env::bus_endpoints(),
    )
    .with_dedupe(DedupePolicy::Disabled);

    let writer = LedgerWriter::new(LedgerConfig::new(&paths.ledger_path), key);
    run_zooid(paths, config, LedgerWriterZooid::new(writer), cancel).await
}

/// The historian worker (subscribes to everything).
pub async fn historian(paths: &ColonyPaths, cancel: CancellationToken) -> anyhow::Result<()> {
    let config = ZooidConfig::new(
        "chembus_historian",
        "observability",
        "colony",
        vec![String::new()],
        env::bus_endpoints(),
    )
    .with_dedupe(DedupePolicy::Disabled);

    let historian = Historian::new(HistorianConfig::new(&paths.history_path));
    run_zooid(paths, config, historian, cancel).await
}

/// The latency tracking zooid.
pub async fn latency_tracker(paths: &ColonyPaths, cancel: CancellationToken) -> anyhow::Result<()> {
    let key = SigningKey::load(&paths.hmac_key_path)
        .with_context(|| format!("loading HMAC key from {}", paths.hmac_key_path.display()))?;

    let config = ZooidConfig::new(
        "LatencyTracker_v1",
        "latency_monitoring",
        "queue_management",
        vec![topics::Q_LATENCY_SPIKE.to_string()],
        env::bus_endpoints(),
    )
    .with_dedupe(DedupePolicy::Manual)
    .with_signing_key(key);

    run_zooid(paths, config, LatencyTracker::new(), cancel).await
}

/// The backpressure balancing zooid.
pub async fn backpressure_balancer(
    paths: &ColonyPaths,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let config = ZooidConfig::new(
        "BackpressureBalancer_v1",
        "backpressure_control",
        "queue_management",
        vec![topics::Q_LATENCY_SPIKE.to_string()],
        env::bus_endpoints(),
    );

    run_zooid(paths, config, BackpressureBalancer::new(), cancel).await
}
