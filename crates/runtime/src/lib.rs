// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! klr-runtime: The library every zooid embeds.
//!
//! A zooid process is one [`ZooidRuntime`] wrapping one [`Zooid`]
//! implementation. The runtime owns the subscriptions (one receive
//! task per topic prefix, fanned into a single serialized dispatch
//! queue), the replay-defense cache, the heartbeat, the kill switch,
//! and the maintenance gate. Concrete zooids only implement
//! `on_message` and emit through the context.

pub mod dedupe;
pub mod maintenance;
pub mod runtime;
pub mod workers;

pub use dedupe::IncidentCache;
pub use maintenance::MaintenanceMode;
pub use runtime::{DedupePolicy, Zooid, ZooidConfig, ZooidContext, ZooidRuntime};

use thiserror::Error;

/// Runtime startup errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("bus error: {0}")]
    Bus(#[from] klr_bus::BusError),

    #[error("ledger error: {0}")]
    Ledger(#[from] klr_ledger::LedgerError),

    #[error("registry error: {0}")]
    Registry(#[from] klr_registry::RegistryError),
}
