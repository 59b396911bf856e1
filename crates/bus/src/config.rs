// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus endpoint configuration.

/// Loopback endpoints for the proxy.
///
/// Publishers connect to `ingress`, subscribers connect to `egress`.
/// Both stay on 127.0.0.1 — the colony is single-host by design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEndpoints {
    /// Where publishers connect (the proxy binds its receiving side here).
    pub ingress: String,
    /// Where subscribers connect (the proxy binds its sending side here).
    pub egress: String,
}

impl Default for BusEndpoints {
    fn default() -> Self {
        Self {
            ingress: "tcp://127.0.0.1:5556".to_string(),
            egress: "tcp://127.0.0.1:5557".to_string(),
        }
    }
}

impl BusEndpoints {
    pub fn new(ingress: impl Into<String>, egress: impl Into<String>) -> Self {
        Self {
            ingress: ingress.into(),
            egress: egress.into(),
        }
    }

    /// Loopback TCP endpoints on the given port pair.
    pub fn loopback(ingress_port: u16, egress_port: u16) -> Self {
        Self {
            ingress: format!("tcp://127.0.0.1:{ingress_port}"),
            egress: format!("tcp://127.0.0.1:{egress_port}"),
        }
    }
}
