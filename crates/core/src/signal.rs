// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Signal envelope — the only message type on the bus.
//!
//! Sent on the wire as two frames: `[topic_bytes, canonical_json_bytes]`.
//! Signals are transient; anything that must survive a restart goes
//! through the fitness ledger instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors decoding or encoding a signal.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("topic frame is not UTF-8")]
    TopicNotUtf8,

    #[error("payload is not a valid signal: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A broadcast signal.
///
/// `signal` is the topic string and is duplicated into the topic frame
/// so subscribers can prefix-match without parsing the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Topic string (e.g. `Q_LATENCY_SPIKE`).
    pub signal: String,
    /// Subsystem tag (e.g. `queue_management`).
    pub ecosystem: String,
    /// Strength of the stimulus, 0.0–1.0.
    pub intensity: f64,
    /// Topic-specific payload.
    #[serde(default)]
    pub facts: Map<String, Value>,
    /// Groups causally related emissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
    /// Correlation string for tracing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    /// Seconds since epoch at emission.
    pub ts: f64,
}

impl Signal {
    /// Create a signal with full intensity and empty facts.
    pub fn new(topic: impl Into<String>, ecosystem: impl Into<String>, ts: f64) -> Self {
        Self {
            signal: topic.into(),
            ecosystem: ecosystem.into(),
            intensity: 1.0,
            facts: Map::new(),
            incident_id: None,
            trace: None,
            ts,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_facts(mut self, facts: Map<String, Value>) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_incident(mut self, incident_id: impl Into<String>) -> Self {
        self.incident_id = Some(incident_id.into());
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Encode as the two wire frames `[topic, canonical payload]`.
    pub fn to_frames(&self) -> Result<(Vec<u8>, Vec<u8>), SignalError> {
        let payload = crate::canonical::to_canonical_json(self)?;
        Ok((self.signal.as_bytes().to_vec(), payload.into_bytes()))
    }

    /// Decode from wire frames.
    ///
    /// The topic frame wins over the payload's `signal` field so that a
    /// forwarded frame pair stays self-consistent.
    pub fn from_frames(topic: &[u8], payload: &[u8]) -> Result<Self, SignalError> {
        let topic = std::str::from_utf8(topic).map_err(|_| SignalError::TopicNotUtf8)?;
        let mut signal: Signal = serde_json::from_slice(payload)?;
        if signal.signal != topic {
            signal.signal = topic.to_string();
        }
        Ok(signal)
    }

    pub fn log_summary(&self) -> String {
        match &self.incident_id {
            Some(inc) => format!(
                "{} eco={} intensity={:.2} incident={inc}",
                self.signal, self.ecosystem, self.intensity
            ),
            None => format!(
                "{} eco={} intensity={:.2}",
                self.signal, self.ecosystem, self.intensity
            ),
        }
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
