// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signed observation rows for the fitness ledger.
//!
//! The HMAC-SHA256 signature covers the canonical JSON of the row with
//! the `sig` field removed — the Signal envelope around the row is NOT
//! part of the signed bytes. The shared key is loaded once from a
//! mode-600 file.

use std::path::Path;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Errors signing, verifying, or loading keys.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("failed to read signing key at {path}: {source}")]
    KeyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("signing key is empty")]
    EmptyKey,

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared HMAC key for observation signing.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Load the key from a file, warning when permissions are looser
    /// than 0600.
    pub fn load(path: &Path) -> Result<Self, ObservationError> {
        let bytes = std::fs::read(path).map_err(|source| ObservationError::KeyRead {
            path: path.display().to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(ObservationError::EmptyKey);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(path) {
                let mode = meta.permissions().mode() & 0o777;
                if mode & 0o077 != 0 {
                    warn!(
                        path = %path.display(),
                        mode = format!("{mode:o}"),
                        "signing key is readable by group/other, expected 0600",
                    );
                }
            }
        }

        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts any key length, so this cannot fail.
        #[allow(clippy::unwrap_used)]
        let mac = HmacSha256::new_from_slice(&self.0).unwrap();
        mac
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.0.len())
            .finish()
    }
}

/// One row of the fitness ledger.
///
/// Unknown extra facts ride along in `extras` and are covered by the
/// signature like every other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ts: f64,
    pub incident_id: String,
    pub zooid: String,
    pub niche: String,
    pub ecosystem: String,
    /// Outcome; rows with no outcome are treated as passes downstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// Time to respond in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttr_ms: Option<f64>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
    /// HMAC-SHA256 hex digest over all other fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl Observation {
    pub fn new(
        ts: f64,
        incident_id: impl Into<String>,
        zooid: impl Into<String>,
        niche: impl Into<String>,
        ecosystem: impl Into<String>,
    ) -> Self {
        Self {
            ts,
            incident_id: incident_id.into(),
            zooid: zooid.into(),
            niche: niche.into(),
            ecosystem: ecosystem.into(),
            ok: None,
            ttr_ms: None,
            extras: Map::new(),
            sig: None,
        }
    }

    pub fn with_outcome(mut self, ok: bool) -> Self {
        self.ok = Some(ok);
        self
    }

    pub fn with_ttr_ms(mut self, ttr_ms: f64) -> Self {
        self.ttr_ms = Some(ttr_ms);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Canonical bytes the signature covers: the row as a JSON object
    /// with `sig` removed, keys sorted, tight separators.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, ObservationError> {
        let value = serde_json::to_value(self)?;
        let canonical = crate::canonical::to_canonical_json_without(&value, "sig")?;
        Ok(canonical.into_bytes())
    }

    /// Sign in place, overwriting any existing signature.
    pub fn sign(&mut self, key: &SigningKey) -> Result<(), ObservationError> {
        self.sig = None;
        let mut mac = key.mac();
        mac.update(&self.signed_bytes()?);
        self.sig = Some(hex::encode(mac.finalize().into_bytes()));
        Ok(())
    }

    /// Verify the signature. Rows without a `sig` field never verify.
    pub fn verify(&self, key: &SigningKey) -> bool {
        let Some(sig) = &self.sig else {
            return false;
        };
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(bytes) = self.signed_bytes() else {
            return false;
        };
        let mut mac = key.mac();
        mac.update(&bytes);
        mac.verify_slice(&expected).is_ok()
    }

    /// Parse a row out of an OBSERVATION signal's facts block.
    pub fn from_facts(facts: &Map<String, Value>) -> Result<Self, ObservationError> {
        let value = Value::Object(facts.clone());
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
#[path = "observation_tests.rs"]
mod tests;
