// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger writer zooid.
//!
//! Bridges OBSERVATION signals into the fitness ledger. The actual
//! verification and append live in `klr-ledger`; this wrapper is what
//! gives the writer a heartbeat, a kill switch, and the maintenance
//! gate. Runs with [`crate::DedupePolicy::Disabled`] — several zooids
//! legitimately observe the same incident.

use klr_core::{topics, Signal};
use klr_ledger::LedgerWriter;
use serde_json::{json, Value};
use tracing::error;

use crate::{Zooid, ZooidContext};

/// The colony's single ledger ingestion point.
#[derive(Debug)]
pub struct LedgerWriterZooid {
    writer: LedgerWriter,
}

impl LedgerWriterZooid {
    pub fn new(writer: LedgerWriter) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &LedgerWriter {
        &self.writer
    }
}

impl Zooid for LedgerWriterZooid {
    fn on_message(&mut self, signal: &Signal, _ctx: &mut ZooidContext) {
        if signal.signal != topics::OBSERVATION {
            return;
        }
        // Rejections (bad signature, junk facts) are counted inside
        // the writer; only real I/O failures surface here.
        if let Err(e) = self.writer.ingest(signal) {
            error!(error = %e, "ledger append failed");
        }
    }

    fn health(&self) -> Value {
        json!({
            "status": "ok",
            "accepted": self.writer.accepted(),
            "rejected_signatures": self.writer.rejected(),
        })
    }
}

#[cfg(test)]
#[path = "ledger_writer_tests.rs"]
mod tests;
