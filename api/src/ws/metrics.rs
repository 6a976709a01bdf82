//! Fan-out metrics.
//!
//! Atomic counters for connections, subscriptions and dispatch outcomes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Metrics for the WebSocket server.
#[derive(Debug)]
pub struct WsMetrics {
    /// Total connections opened.
    connections_opened: AtomicU64,

    /// Total connections closed.
    connections_closed: AtomicU64,

    /// Total messages received.
    messages_received: AtomicU64,

    /// Total messages sent.
    messages_sent: AtomicU64,

    /// Total errors.
    errors: AtomicU64,

    /// Total subscriptions.
    subscriptions: AtomicU64,

    /// Total unsubscriptions.
    unsubscriptions: AtomicU64,

    /// Total dispatched events.
    dispatches: AtomicU64,

    /// Per-connection deliveries queued by the dispatcher.
    deliveries: AtomicU64,

    /// Per-connection sends that failed during dispatch.
    send_failures: AtomicU64,

    /// Connections torn down after a failed send.
    teardowns: AtomicU64,

    /// Upgrade requests rejected for a missing or invalid credential.
    auth_failures: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for WsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WsMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            subscriptions: AtomicU64::new(0),
            unsubscriptions: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            teardowns: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a connection opened.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection closed.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a message received.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a message sent.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a subscription.
    pub fn record_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unsubscription.
    pub fn record_unsubscription(&self) {
        self.unsubscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one dispatched event and its per-connection outcome.
    pub fn record_dispatch(&self, delivered: usize, failed: usize) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.send_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Records a connection torn down by the dispatcher.
    pub fn record_teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rejected upgrade.
    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total connections opened.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns the total connections closed.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns the current active connections.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.connections_opened()
            .saturating_sub(self.connections_closed())
    }

    /// Returns the total messages received.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Returns the total messages sent.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Returns the total errors.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the total subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> u64 {
        self.subscriptions.load(Ordering::Relaxed)
    }

    /// Returns the total unsubscriptions.
    #[must_use]
    pub fn unsubscriptions(&self) -> u64 {
        self.unsubscriptions.load(Ordering::Relaxed)
    }

    /// Returns the total dispatched events.
    #[must_use]
    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Returns the total deliveries.
    #[must_use]
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Returns the total failed sends.
    #[must_use]
    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    /// Returns the total teardowns.
    #[must_use]
    pub fn teardowns(&self) -> u64 {
        self.teardowns.load(Ordering::Relaxed)
    }

    /// Returns the total rejected upgrades.
    #[must_use]
    pub fn auth_failures(&self) -> u64 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns messages per second (received + sent).
    #[must_use]
    pub fn messages_per_second(&self) -> f64 {
        let elapsed = self.uptime().as_secs_f64();
        if elapsed > 0.0 {
            (self.messages_received() + self.messages_sent()) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> WsMetricsSnapshot {
        WsMetricsSnapshot {
            connections_opened: self.connections_opened(),
            connections_closed: self.connections_closed(),
            active_connections: self.active_connections(),
            messages_received: self.messages_received(),
            messages_sent: self.messages_sent(),
            errors: self.errors(),
            subscriptions: self.subscriptions(),
            unsubscriptions: self.unsubscriptions(),
            dispatches: self.dispatches(),
            deliveries: self.deliveries(),
            send_failures: self.send_failures(),
            teardowns: self.teardowns(),
            auth_failures: self.auth_failures(),
            uptime_secs: self.uptime().as_secs(),
            messages_per_second: self.messages_per_second(),
        }
    }
}

/// A point-in-time snapshot of fan-out metrics.
#[derive(Debug, Clone, Serialize)]
pub struct WsMetricsSnapshot {
    /// Total connections opened.
    pub connections_opened: u64,
    /// Total connections closed.
    pub connections_closed: u64,
    /// Active connections.
    pub active_connections: u64,
    /// Messages received.
    pub messages_received: u64,
    /// Messages sent.
    pub messages_sent: u64,
    /// Errors.
    pub errors: u64,
    /// Subscriptions.
    pub subscriptions: u64,
    /// Unsubscriptions.
    pub unsubscriptions: u64,
    /// Dispatched events.
    pub dispatches: u64,
    /// Per-connection deliveries.
    pub deliveries: u64,
    /// Per-connection send failures.
    pub send_failures: u64,
    /// Connections torn down by the dispatcher.
    pub teardowns: u64,
    /// Rejected upgrades.
    pub auth_failures: u64,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Messages per second.
    pub messages_per_second: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record_connection() {
        let metrics = WsMetrics::new();

        metrics.record_connection_opened();
        metrics.record_connection_opened();
        assert_eq!(metrics.connections_opened(), 2);
        assert_eq!(metrics.active_connections(), 2);

        metrics.record_connection_closed();
        assert_eq!(metrics.connections_closed(), 1);
        assert_eq!(metrics.active_connections(), 1);
    }

    #[test]
    fn test_metrics_record_messages() {
        let metrics = WsMetrics::new();

        metrics.record_message_received();
        metrics.record_message_received();
        metrics.record_message_sent();

        assert_eq!(metrics.messages_received(), 2);
        assert_eq!(metrics.messages_sent(), 1);
    }

    #[test]
    fn test_metrics_record_subscription() {
        let metrics = WsMetrics::new();

        metrics.record_subscription();
        metrics.record_subscription();
        metrics.record_unsubscription();

        assert_eq!(metrics.subscriptions(), 2);
        assert_eq!(metrics.unsubscriptions(), 1);
    }

    #[test]
    fn test_metrics_record_dispatch() {
        let metrics = WsMetrics::new();

        metrics.record_dispatch(2, 1);
        metrics.record_dispatch(3, 0);
        metrics.record_teardown();

        assert_eq!(metrics.dispatches(), 2);
        assert_eq!(metrics.deliveries(), 5);
        assert_eq!(metrics.send_failures(), 1);
        assert_eq!(metrics.teardowns(), 1);
    }

    #[test]
    fn test_metrics_snapshot_serializes() {
        let metrics = WsMetrics::new();
        metrics.record_auth_failure();

        let value = serde_json::to_value(metrics.snapshot()).expect("json");
        assert_eq!(value["auth_failures"], 1);
        assert!(value["uptime_secs"].is_u64());
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = WsMetrics::new();

        metrics.record_connection_opened();
        metrics.record_message_received();
        metrics.record_message_sent();

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.connections_opened, 1);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.messages_sent, 1);
    }
}
