// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known signal topics.
//!
//! Subscriptions are prefix matches on the topic frame, so topic names
//! double as namespaces: `Q_` topics are queue-management traffic,
//! `OBSERVATION` and `HEARTBEAT` are colony plumbing.

/// Signed fitness observation consumed by the ledger writer.
pub const OBSERVATION: &str = "OBSERVATION";

/// Periodic worker liveness beacon.
pub const HEARTBEAT: &str = "HEARTBEAT";

/// p95 latency spike detected on a queue.
pub const Q_LATENCY_SPIKE: &str = "Q_LATENCY_SPIKE";

/// Queue consumer has stopped making progress.
pub const Q_STALL: &str = "Q_STALL";

/// Predicted congestion on a queue.
pub const Q_CONGESTION_FORECAST: &str = "Q_CONGESTION_FORECAST";

/// Queue with no live consumer.
pub const Q_ORPHANED_QUEUE: &str = "Q_ORPHANED_QUEUE";

/// Curiosity investigation request routed from intent files.
pub const Q_CURIOSITY_INVESTIGATE: &str = "Q_CURIOSITY_INVESTIGATE";

/// Throttle/plan fragment proposed by a control zooid.
pub const PLAN_FRAGMENT: &str = "PLAN_FRAGMENT";
