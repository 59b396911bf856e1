// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! klr-ledger: The append-only fitness ledger.
//!
//! One JSONL file, one writer. The writer verifies each observation's
//! HMAC before appending; everything else in the colony only reads.
//! Rows are never edited in place — the file is rotated by size,
//! keeping the newest lines and moving older content to `.old`.

pub mod query;
pub mod writer;

pub use query::{FitnessSummary, LedgerQuery};
pub use writer::{LedgerConfig, LedgerWriter};

use thiserror::Error;

/// Errors from ledger I/O.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("observation error: {0}")]
    Observation(#[from] klr_core::ObservationError),
}
