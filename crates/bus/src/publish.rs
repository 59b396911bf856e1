// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal publisher.
//!
//! Publishing is fire-and-forget: when the proxy is down the message
//! is dropped with a warning, and the connection is retried with
//! capped exponential backoff on the next emit. Callers never see a
//! transport error.

use std::time::{Duration, Instant};

use klr_core::Signal;
use tracing::{debug, info, warn};
use zeromq::{PubSocket, Socket, SocketSend, ZmqMessage};

use crate::BusError;

/// New PUB sockets miss messages sent before the subscriber handshake
/// completes; emitting is delayed by this much after every (re)connect.
const SLOW_JOINER_DELAY: Duration = Duration::from_millis(150);

/// Reconnect backoff bounds.
const BACKOFF_BASE: Duration = Duration::from_millis(250);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// A connected (or connecting) publisher.
pub struct SignalPublisher {
    endpoint: String,
    socket: Option<PubSocket>,
    /// Consecutive failed connection attempts.
    failed_attempts: u32,
    /// Earliest instant the next connection attempt may run.
    retry_at: Instant,
}

impl SignalPublisher {
    /// Create a publisher for the proxy's ingress endpoint. No I/O
    /// happens until the first `publish`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            socket: None,
            failed_attempts: 0,
            retry_at: Instant::now(),
        }
    }

    /// Connect eagerly, waiting out the slow-joiner delay so the first
    /// emitted signal is not lost to the subscription handshake.
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, BusError> {
        let mut publisher = Self::new(endpoint);
        let mut socket = PubSocket::new();
        socket.connect(&publisher.endpoint).await?;
        tokio::time::sleep(SLOW_JOINER_DELAY).await;
        info!(endpoint = %publisher.endpoint, "publisher connected");
        publisher.socket = Some(socket);
        Ok(publisher)
    }

    /// Publish one signal as `[topic, canonical_json]`.
    ///
    /// Never fails: encoding problems and transport failures are
    /// logged and the signal is dropped.
    pub async fn publish(&mut self, signal: &Signal) {
        let (topic, payload) = match signal.to_frames() {
            Ok(frames) => frames,
            Err(e) => {
                warn!(topic = %signal.signal, error = %e, "dropping unencodable signal");
                return;
            }
        };

        if self.socket.is_none() && !self.try_connect().await {
            warn!(topic = %signal.signal, "dropping signal, proxy unreachable");
            return;
        }

        let mut msg = ZmqMessage::from(topic);
        msg.push_back(payload.into());

        if let Some(socket) = self.socket.as_mut() {
            match socket.send(msg).await {
                Ok(()) => {
                    debug!(summary = %signal.log_summary(), "published");
                }
                Err(e) => {
                    // Force a reconnect on the next publish.
                    warn!(topic = %signal.signal, error = %e, "dropping signal, send failed");
                    self.socket = None;
                    self.bump_backoff();
                }
            }
        }
    }

    /// Attempt to (re)connect, honoring the backoff window.
    async fn try_connect(&mut self) -> bool {
        if Instant::now() < self.retry_at {
            return false;
        }

        let mut socket = PubSocket::new();
        match socket.connect(&self.endpoint).await {
            Ok(()) => {
                tokio::time::sleep(SLOW_JOINER_DELAY).await;
                info!(
                    endpoint = %self.endpoint,
                    attempts = self.failed_attempts,
                    "publisher connected",
                );
                self.socket = Some(socket);
                self.failed_attempts = 0;
                true
            }
            Err(e) => {
                self.bump_backoff();
                debug!(endpoint = %self.endpoint, error = %e, "publisher connect failed");
                false
            }
        }
    }

    fn bump_backoff(&mut self) {
        let exp = self.failed_attempts.min(8);
        let delay = (BACKOFF_BASE * 2u32.saturating_pow(exp)).min(BACKOFF_MAX);
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.retry_at = Instant::now() + delay;
    }
}

impl std::fmt::Debug for SignalPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalPublisher")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}
