// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction.
//!
//! The fabric timestamps everything in fractional epoch seconds; pure
//! code takes `now` as an argument, loops take a `Clock` so tests can
//! drive time.

use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;

/// Source of "now" in seconds since the Unix epoch.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Manually advanced clock for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now: Arc<parking_lot::Mutex<f64>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    pub fn at(now: f64) -> Self {
        Self {
            now: Arc::new(parking_lot::Mutex::new(now)),
        }
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }

    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
