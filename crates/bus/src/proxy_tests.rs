// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{SignalPublisher, SignalSubscriber};
use klr_core::Signal;
use serde_json::json;
use std::time::Duration;

async fn recv_with_deadline(
    subscriber: &mut SignalSubscriber,
    cancel: &CancellationToken,
) -> Signal {
    tokio::time::timeout(Duration::from_secs(10), subscriber.recv(cancel))
        .await
        .expect("timed out waiting for signal")
        .expect("subscriber cancelled")
}

#[tokio::test]
async fn proxy_fans_out_with_prefix_filtering() {
    let endpoints = BusEndpoints::loopback(39771, 39772);
    let proxy = SignalProxy::new(endpoints.clone());
    let metrics = proxy.metrics();
    let shutdown = proxy.shutdown_token();

    let proxy_task = tokio::spawn(async move { proxy.run().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Subscriber before publisher, so the slow-joiner delay covers the
    // subscription handshake.
    let mut all = SignalSubscriber::connect(&endpoints.egress, "")
        .await
        .unwrap();
    let mut queue_only = SignalSubscriber::connect(&endpoints.egress, "Q_")
        .await
        .unwrap();
    let mut publisher = SignalPublisher::connect(&endpoints.ingress).await.unwrap();

    let mut facts = serde_json::Map::new();
    facts.insert("p95_ms".to_string(), json!(640.0));

    let heartbeat = Signal::new("HEARTBEAT", "colony", 1.0);
    let spike = Signal::new("Q_LATENCY_SPIKE", "queue_management", 2.0)
        .with_facts(facts)
        .with_incident("inc-proxy-1");

    publisher.publish(&heartbeat).await;
    publisher.publish(&spike).await;

    let cancel = CancellationToken::new();

    // The catch-all subscriber sees both, in publisher FIFO order.
    let first = recv_with_deadline(&mut all, &cancel).await;
    assert_eq!(first.signal, "HEARTBEAT");
    let second = recv_with_deadline(&mut all, &cancel).await;
    assert_eq!(second.signal, "Q_LATENCY_SPIKE");
    assert_eq!(second.incident_id.as_deref(), Some("inc-proxy-1"));

    // The prefixed subscriber only ever sees the Q_ topic.
    let filtered = recv_with_deadline(&mut queue_only, &cancel).await;
    assert_eq!(filtered.signal, "Q_LATENCY_SPIKE");

    assert!(metrics.total_forwarded() >= 2);
    assert!(metrics.count_for("Q_LATENCY_SPIKE") >= 1);

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), proxy_task).await;
}

#[tokio::test]
async fn publisher_drops_silently_without_proxy() {
    // Nothing is listening on this port; publishing must not error or hang.
    let mut publisher = SignalPublisher::new("tcp://127.0.0.1:39799");
    let signal = Signal::new("Q_STALL", "queue_management", 1.0);

    tokio::time::timeout(Duration::from_secs(5), publisher.publish(&signal))
        .await
        .expect("publish should return promptly when the proxy is down");
}

#[tokio::test]
async fn subscriber_recv_returns_none_on_cancel() {
    let endpoints = BusEndpoints::loopback(39781, 39782);
    let proxy = SignalProxy::new(endpoints.clone());
    let shutdown = proxy.shutdown_token();
    let proxy_task = tokio::spawn(async move { proxy.run().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut subscriber = SignalSubscriber::connect(&endpoints.egress, "")
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv(&cancel))
        .await
        .expect("recv should observe cancellation");
    assert!(received.is_none());

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), proxy_task).await;
}
