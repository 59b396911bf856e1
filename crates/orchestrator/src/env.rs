// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the orchestrator.

/// `KLR_ORCHESTRATION_MODE=enabled` gates `tick()`.
pub const ORCHESTRATION_MODE: &str = "KLR_ORCHESTRATION_MODE";

/// `KLR_CHEM_ENABLED=0` routes intents down the legacy RPC path
/// instead of the bus. Defaults to enabled.
pub const CHEM_ENABLED: &str = "KLR_CHEM_ENABLED";

/// Whether orchestration ticks may act.
pub fn orchestration_enabled() -> bool {
    std::env::var(ORCHESTRATION_MODE)
        .map(|v| v == "enabled")
        .unwrap_or(false)
}

/// Whether the intent router broadcasts on the bus.
pub fn chem_enabled() -> bool {
    std::env::var(CHEM_ENABLED).map(|v| v != "0").unwrap_or(true)
}
