// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The signal proxy — the colony's single rendezvous point.
//!
//! Binds a receiving socket on the ingress endpoint (subscribed to all
//! topics) and a sending socket on the egress endpoint, and forwards
//! frames verbatim. The `zeromq` crate has no XPUB/XSUB socket types,
//! so the classic forwarder is emulated with SUB(all) + PUB; the
//! trade-off is that subscription frames are not visible upstream, so
//! the proxy logs first-seen topics and per-topic counts instead of
//! individual subscribe/unsubscribe events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeromq::{PubSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::{BusEndpoints, BusError};

/// Traffic counters kept while the proxy runs.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    /// Total frames pairs forwarded.
    pub forwarded: AtomicU64,
    /// Forward attempts that failed on the egress side.
    pub dropped: AtomicU64,
    /// Per-topic forward counts.
    pub topic_counts: Mutex<HashMap<String, u64>>,
}

impl ProxyMetrics {
    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn count_for(&self, topic: &str) -> u64 {
        self.topic_counts.lock().get(topic).copied().unwrap_or(0)
    }
}

/// Long-running ingress → egress forwarder.
pub struct SignalProxy {
    endpoints: BusEndpoints,
    metrics: Arc<ProxyMetrics>,
    shutdown: CancellationToken,
}

impl SignalProxy {
    pub fn new(endpoints: BusEndpoints) -> Self {
        Self {
            endpoints,
            metrics: Arc::new(ProxyMetrics::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn metrics(&self) -> Arc<ProxyMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Token that stops the proxy loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind both sides and forward until shutdown.
    ///
    /// The proxy must be up before any publisher or subscriber; bind
    /// failures are returned, forward failures are logged and counted
    /// but never fatal.
    pub async fn run(&self) -> Result<(), BusError> {
        let mut ingress = zeromq::SubSocket::new();
        ingress.bind(&self.endpoints.ingress).await?;
        // All topics flow through; filtering happens at subscribers.
        ingress.subscribe("").await?;
        info!(endpoint = %self.endpoints.ingress, "proxy ingress bound, publishers connect here");

        let mut egress = PubSocket::new();
        egress.bind(&self.endpoints.egress).await?;
        info!(endpoint = %self.endpoints.egress, "proxy egress bound, subscribers connect here");

        let mut seen_topics: HashMap<String, ()> = HashMap::new();
        info!("proxy forwarder loop started");

        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(
                        forwarded = self.metrics.total_forwarded(),
                        dropped = self.metrics.total_dropped(),
                        "proxy stopped",
                    );
                    return Ok(());
                }
                recv = ingress.recv() => match recv {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "proxy ingress recv error");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        continue;
                    }
                },
            };

            let topic = extract_topic(&msg);
            if seen_topics.insert(topic.clone(), ()).is_none() {
                info!(topic = %topic, "first signal observed on topic");
            }

            {
                let mut counts = self.metrics.topic_counts.lock();
                *counts.entry(topic.clone()).or_insert(0) += 1;
            }

            debug!(topic = %topic, parts = msg.len(), "forwarding");
            match egress.send(msg).await {
                Ok(()) => {
                    self.metrics.forwarded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // Drop policy: always logged, never fatal.
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(topic = %topic, error = %e, "dropping signal, egress send failed");
                }
            }
        }
    }
}

/// Topic string from the first frame, lossy on non-UTF-8.
fn extract_topic(msg: &ZmqMessage) -> String {
    msg.iter()
        .next()
        .map(|frame| String::from_utf8_lossy(frame.as_ref()).into_owned())
        .unwrap_or_else(|| "<empty>".to_string())
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
