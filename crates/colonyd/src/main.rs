// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! KLoROS colony daemon (klrd)
//!
//! One process per colony role:
//! - `klrd proxy` — the bus forwarder (must be up first)
//! - `klrd orchestrator` — tick loop (PHASE, promotions, dream)
//! - worker roles — ledger-writer, historian, quarantine, and the
//!   reference zooids
//!
//! Exit codes: 0 normal, 124 subprocess timeout (propagated from
//! one-shot jobs), non-zero on unrecoverable I/O during
//! commit/rollback.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use clap::{Parser, Subcommand};
use klr_colonyd::{roles, ColonyPaths};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "klrd", version, about = "KLoROS colony orchestration fabric")]
struct Cli {
    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Run the signal bus proxy (ingress → egress forwarder)
    Proxy,
    /// Run the orchestrator tick loop
    Orchestrator {
        /// Seconds between ticks
        #[arg(long, default_value_t = 60)]
        interval_s: u64,
    },
    /// Run a single orchestrator tick and print the outcome
    Tick,
    /// Run one dream (evolution) cycle synchronously
    Dream,
    /// Roll the baseline back to an archived version
    Rollback {
        #[arg(long)]
        version: u64,
    },
    /// Route durable intent files onto the bus
    IntentRouter {
        #[arg(long, default_value_t = 5)]
        interval_s: u64,
    },
    /// Run the fitness ledger writer
    LedgerWriter,
    /// Capture all bus traffic into the history file
    Historian,
    /// Run the quarantine sweeper
    Quarantine {
        #[arg(long, default_value_t = 300)]
        interval_s: u64,
    },
    /// Run the latency tracking zooid
    LatencyTracker,
    /// Run the backpressure balancing zooid
    BackpressureBalancer,
}

impl Role {
    fn name(&self) -> &'static str {
        match self {
            Role::Proxy => "proxy",
            Role::Orchestrator { .. } => "orchestrator",
            Role::Tick => "tick",
            Role::Dream => "dream",
            Role::Rollback { .. } => "rollback",
            Role::IntentRouter { .. } => "intent-router",
            Role::LedgerWriter => "ledger-writer",
            Role::Historian => "historian",
            Role::Quarantine { .. } => "quarantine",
            Role::LatencyTracker => "latency-tracker",
            Role::BackpressureBalancer => "backpressure-balancer",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = ColonyPaths::load()?;
    let _log_guard = setup_logging(&paths, cli.role.name())?;

    info!(role = cli.role.name(), state_dir = %paths.state_dir.display(), "starting");

    // SIGTERM/SIGINT flip the shared kill switch; roles drain and exit.
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone())?;

    match cli.role {
        Role::Proxy => roles::proxy(cancel).await?,
        Role::Orchestrator { interval_s } => {
            roles::orchestrator(&paths, interval_s, cancel).await?
        }
        Role::Tick => {
            let outcome = roles::tick_once(&paths).await?;
            println!("{outcome}");
        }
        Role::Dream => {
            // Propagate the cycle's exit code (124 on timeout).
            let exit_code = roles::dream_once(&paths).await?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Role::Rollback { version } => roles::rollback(&paths, version)?,
        Role::IntentRouter { interval_s } => {
            roles::intent_router(&paths, interval_s, cancel).await?
        }
        Role::LedgerWriter => roles::ledger_writer(&paths, cancel).await?,
        Role::Historian => roles::historian(&paths, cancel).await?,
        Role::Quarantine { interval_s } => roles::quarantine(&paths, interval_s, cancel).await?,
        Role::LatencyTracker => roles::latency_tracker(&paths, cancel).await?,
        Role::BackpressureBalancer => roles::backpressure_balancer(&paths, cancel).await?,
    }

    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received"),
            _ = sigint.recv() => info!("SIGINT received"),
        }
        cancel.cancel();
    });
    Ok(())
}

fn setup_logging(
    paths: &ColonyPaths,
    role: &str,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&paths.log_dir)?;
    let file_appender =
        tracing_appender::rolling::never(&paths.log_dir, format!("klrd-{role}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(guard)
}
