// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal subscriber with prefix matching and silent reconnect.

use std::time::Duration;

use klr_core::Signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeromq::{Socket, SocketRecv};

use crate::BusError;

const RECONNECT_BASE: Duration = Duration::from_millis(250);
const RECONNECT_MAX: Duration = Duration::from_secs(60);

/// A subscription to one topic prefix on the proxy's egress endpoint.
///
/// An empty prefix matches all topics. Transport errors never escape
/// `recv`: the subscriber reconnects with capped exponential backoff
/// and keeps going.
pub struct SignalSubscriber {
    endpoint: String,
    prefix: String,
    socket: Option<zeromq::SubSocket>,
    failed_attempts: u32,
}

impl SignalSubscriber {
    /// Connect and subscribe. The initial connection is retried inside
    /// `recv`, so construction is infallible apart from the first
    /// attempt's result being logged.
    pub async fn connect(
        endpoint: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self, BusError> {
        let mut subscriber = Self {
            endpoint: endpoint.into(),
            prefix: prefix.into(),
            socket: None,
            failed_attempts: 0,
        };
        subscriber.open().await?;
        Ok(subscriber)
    }

    async fn open(&mut self) -> Result<(), BusError> {
        let mut socket = zeromq::SubSocket::new();
        socket.connect(&self.endpoint).await?;
        socket.subscribe(&self.prefix).await?;
        info!(
            endpoint = %self.endpoint,
            prefix = %self.prefix,
            "subscriber connected",
        );
        self.socket = Some(socket);
        self.failed_attempts = 0;
        Ok(())
    }

    /// Receive the next well-formed signal matching the prefix.
    ///
    /// Returns `None` when `cancel` fires. Malformed frames are logged
    /// and skipped; disconnects trigger silent reconnection.
    pub async fn recv(&mut self, cancel: &CancellationToken) -> Option<Signal> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            if self.socket.is_none() {
                let exp = self.failed_attempts.min(8);
                let delay = (RECONNECT_BASE * 2u32.saturating_pow(exp)).min(RECONNECT_MAX);
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
                if let Err(e) = self.open().await {
                    debug!(endpoint = %self.endpoint, error = %e, "subscriber reconnect failed");
                    continue;
                }
            }

            let Some(socket) = self.socket.as_mut() else {
                continue;
            };

            let msg = tokio::select! {
                _ = cancel.cancelled() => return None,
                recv = socket.recv() => match recv {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(prefix = %self.prefix, error = %e, "subscriber recv error, reconnecting");
                        self.socket = None;
                        continue;
                    }
                },
            };

            let frames: Vec<_> = msg.iter().collect();
            if frames.len() < 2 {
                debug!(parts = frames.len(), "skipping short frame set");
                continue;
            }

            match Signal::from_frames(frames[0].as_ref(), frames[1].as_ref()) {
                Ok(signal) => return Some(signal),
                Err(e) => {
                    warn!(prefix = %self.prefix, error = %e, "skipping malformed signal");
                }
            }
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl std::fmt::Debug for SignalSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSubscriber")
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}
