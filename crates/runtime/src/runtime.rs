// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The zooid runtime.
//!
//! One receive task per subscribed topic prefix feeds a single mpsc
//! queue; the dispatch loop serializes `on_message` calls, applies the
//! maintenance gate and replay defense, emits heartbeats, and obeys
//! the kill switch (drain in-flight work, then exit).
//!
//! Zooids never publish directly — they queue signals on the context
//! and the runtime flushes them after each dispatch. That keeps
//! `on_message` synchronous, pure, and unit-testable.

use std::time::Duration;

use klr_bus::{BusEndpoints, SignalPublisher, SignalSubscriber};
use klr_core::{topics, Clock, Observation, Signal, SigningKey, SystemClock};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{IncidentCache, MaintenanceMode};

/// How the runtime applies replay defense for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupePolicy {
    /// Mark the incident handled when it is first dispatched; later
    /// signals with the same incident id are skipped.
    #[default]
    OnDispatch,
    /// Skip incidents the zooid has marked handled via
    /// [`ZooidContext::mark_handled`]; dispatch does not mark. For
    /// workers that aggregate several signals per incident.
    Manual,
    /// No replay defense (plumbing workers like the historian and the
    /// ledger writer, which must see every signal).
    Disabled,
}

/// Construction-time configuration for a worker.
#[derive(Debug, Clone)]
pub struct ZooidConfig {
    pub name: String,
    pub niche: String,
    pub ecosystem: String,
    /// Topic prefixes to subscribe; empty string matches everything.
    pub topics: Vec<String>,
    pub endpoints: BusEndpoints,
    pub heartbeat_interval: Duration,
    pub dedupe: DedupePolicy,
    pub dedupe_capacity: usize,
    /// Shared HMAC key; absent means the worker cannot emit signed
    /// observations (emit attempts are logged and dropped).
    pub signing_key: Option<SigningKey>,
}

impl ZooidConfig {
    pub fn new(
        name: impl Into<String>,
        niche: impl Into<String>,
        ecosystem: impl Into<String>,
        topics: Vec<String>,
        endpoints: BusEndpoints,
    ) -> Self {
        Self {
            name: name.into(),
            niche: niche.into(),
            ecosystem: ecosystem.into(),
            topics,
            endpoints,
            heartbeat_interval: Duration::from_secs(30),
            dedupe: DedupePolicy::default(),
            dedupe_capacity: IncidentCache::DEFAULT_CAPACITY,
            signing_key: None,
        }
    }

    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn with_dedupe(mut self, policy: DedupePolicy) -> Self {
        self.dedupe = policy;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// What a zooid sees during one `on_message` call.
pub struct ZooidContext {
    name: String,
    niche: String,
    ecosystem: String,
    signing_key: Option<SigningKey>,
    handled: IncidentCache,
    now: f64,
    pending: Vec<Signal>,
}

impl ZooidContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn niche(&self) -> &str {
        &self.niche
    }

    pub fn ecosystem(&self) -> &str {
        &self.ecosystem
    }

    /// Dispatch timestamp, seconds since epoch.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Queue a signal for publication after this dispatch returns.
    pub fn emit(&mut self, signal: Signal) {
        self.pending.push(signal);
    }

    /// Compose, sign, and queue one OBSERVATION for the ledger.
    ///
    /// Without a signing key the observation is dropped with a warning
    /// (the ledger writer would reject it anyway).
    pub fn emit_observation(
        &mut self,
        incident_id: &str,
        ok: Option<bool>,
        ttr_ms: Option<f64>,
        extras: Map<String, Value>,
    ) {
        let Some(key) = &self.signing_key else {
            warn!(zooid = %self.name, "no signing key, dropping observation");
            return;
        };

        let mut observation = Observation::new(
            self.now,
            incident_id,
            self.name.clone(),
            self.niche.clone(),
            self.ecosystem.clone(),
        );
        observation.ok = ok;
        observation.ttr_ms = ttr_ms;
        observation.extras = extras;

        if let Err(e) = observation.sign(key) {
            warn!(zooid = %self.name, error = %e, "failed to sign observation");
            return;
        }

        let facts = match serde_json::to_value(&observation) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!(zooid = %self.name, "observation did not serialize to an object");
                return;
            }
        };

        let mut signal = Signal::new(topics::OBSERVATION, self.ecosystem.clone(), self.now)
            .with_facts(facts);
        signal.incident_id = Some(incident_id.to_string());
        self.pending.push(signal);
    }

    /// Mark an incident handled (used with [`DedupePolicy::Manual`]).
    pub fn mark_handled(&mut self, incident_id: &str) {
        self.handled.mark(incident_id);
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn drain_pending(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.pending)
    }
}

/// The capability a concrete worker implements.
///
/// `on_message` runs serialized on the dispatch loop; long work should
/// emit follow-up signals instead of blocking.
pub trait Zooid: Send {
    fn on_message(&mut self, signal: &Signal, ctx: &mut ZooidContext);

    /// Health snapshot carried in heartbeats.
    fn health(&self) -> Value {
        json!({"status": "ok"})
    }
}

/// The runtime harness around one zooid.
pub struct ZooidRuntime<C: Clock = SystemClock> {
    config: ZooidConfig,
    clock: C,
    kill: CancellationToken,
    handled: IncidentCache,
}

impl ZooidRuntime<SystemClock> {
    pub fn new(config: ZooidConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ZooidRuntime<C> {
    pub fn with_clock(config: ZooidConfig, clock: C) -> Self {
        let handled = IncidentCache::new(config.dedupe_capacity);
        Self {
            config,
            clock,
            kill: CancellationToken::new(),
            handled,
        }
    }

    /// The kill switch: cancel it to drain in-flight work and exit.
    pub fn kill_switch(&self) -> CancellationToken {
        self.kill.clone()
    }

    /// Run the worker until the kill switch fires.
    pub async fn run<Z: Zooid>(self, mut zooid: Z) {
        let ZooidConfig {
            name,
            niche,
            ecosystem,
            topics: prefixes,
            endpoints,
            heartbeat_interval,
            dedupe,
            signing_key,
            ..
        } = self.config;

        info!(zooid = %name, niche = %niche, topics = ?prefixes, "zooid starting");

        let (tx, mut rx) = mpsc::channel::<Signal>(64);
        for prefix in &prefixes {
            spawn_receive_loop(
                endpoints.egress.clone(),
                prefix.clone(),
                tx.clone(),
                self.kill.clone(),
            );
        }
        drop(tx);

        let mut publisher = SignalPublisher::new(endpoints.ingress.clone());
        let mut ctx = ZooidContext {
            name: name.clone(),
            niche: niche.clone(),
            ecosystem: ecosystem.clone(),
            signing_key,
            handled: self.handled.clone(),
            now: self.clock.now(),
            pending: Vec::new(),
        };

        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; announce liveness at startup.

        loop {
            if let Some(gate) = MaintenanceMode::current() {
                gate.wait_for_normal_mode(&self.kill).await;
            }

            tokio::select! {
                _ = self.kill.cancelled() => {
                    // Drain in-flight work, then exit.
                    let mut drained = 0usize;
                    while let Ok(signal) = rx.try_recv() {
                        dispatch(&mut zooid, &mut ctx, &signal, dedupe, &self.handled, &self.clock);
                        flush(&mut ctx, &mut publisher).await;
                        drained += 1;
                    }
                    info!(zooid = %name, drained, "kill switch flipped, exiting");
                    return;
                }
                _ = heartbeat.tick() => {
                    let mut facts = Map::new();
                    facts.insert("zooid".to_string(), json!(name.clone()));
                    facts.insert("niche".to_string(), json!(niche.clone()));
                    facts.insert("health".to_string(), zooid.health());
                    let beat = Signal::new(topics::HEARTBEAT, ecosystem.clone(), self.clock.now())
                        .with_facts(facts);
                    publisher.publish(&beat).await;
                }
                received = rx.recv() => {
                    let Some(signal) = received else {
                        warn!(zooid = %name, "all receive loops stopped");
                        return;
                    };
                    dispatch(&mut zooid, &mut ctx, &signal, dedupe, &self.handled, &self.clock);
                    flush(&mut ctx, &mut publisher).await;
                }
            }
        }
    }
}

/// One receive task per prefix: connect (retrying while the proxy is
/// down), then forward every signal into the dispatch queue.
fn spawn_receive_loop(
    endpoint: String,
    prefix: String,
    tx: mpsc::Sender<Signal>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let mut subscriber = match SignalSubscriber::connect(&endpoint, &prefix).await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "subscription connect failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                    continue;
                }
            };

            while let Some(signal) = subscriber.recv(&cancel).await {
                if tx.send(signal).await.is_err() {
                    return;
                }
            }
            // recv only returns None on cancellation.
            return;
        }
    });
}

fn dispatch<Z: Zooid, C: Clock>(
    zooid: &mut Z,
    ctx: &mut ZooidContext,
    signal: &Signal,
    policy: DedupePolicy,
    handled: &IncidentCache,
    clock: &C,
) {
    if let Some(incident_id) = &signal.incident_id {
        let replayed = match policy {
            DedupePolicy::OnDispatch => handled.already_handled(incident_id),
            DedupePolicy::Manual => handled.contains(incident_id),
            DedupePolicy::Disabled => false,
        };
        if replayed {
            debug!(incident = %incident_id, "skipping replayed incident");
            return;
        }
    }

    ctx.now = clock.now();
    zooid.on_message(signal, ctx);
}

async fn flush(ctx: &mut ZooidContext, publisher: &mut SignalPublisher) {
    for signal in std::mem::take(&mut ctx.pending) {
        publisher.publish(&signal).await;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ZooidContext {
    /// Bare context for unit-testing `on_message` implementations.
    pub fn for_testing(name: &str, niche: &str, ecosystem: &str, now: f64) -> Self {
        Self {
            name: name.to_string(),
            niche: niche.to_string(),
            ecosystem: ecosystem.to_string(),
            signing_key: Some(SigningKey::from_bytes(b"test-key".to_vec())),
            handled: IncidentCache::default(),
            now,
            pending: Vec::new(),
        }
    }

    pub fn set_now(&mut self, now: f64) {
        self.now = now;
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
