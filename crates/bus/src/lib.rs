// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! klr-bus: Process-wide broadcast for the colony.
//!
//! One long-running proxy forwards ingress → egress on distinct
//! loopback endpoints. Publishers connect to the ingress, subscribers
//! to the egress; nobody speaks to anybody directly. Delivery is
//! best-effort: when the proxy is down or queues are full, messages are
//! dropped and the drop is logged. Durability lives in the ledger, not
//! here.

pub mod config;
pub mod proxy;
pub mod publish;
pub mod subscribe;

pub use config::BusEndpoints;
pub use proxy::{ProxyMetrics, SignalProxy};
pub use publish::SignalPublisher;
pub use subscribe::SignalSubscriber;

use thiserror::Error;

/// Bus transport errors.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("zmq transport error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("bad frame: {0}")]
    Frame(#[from] klr_core::SignalError),
}
