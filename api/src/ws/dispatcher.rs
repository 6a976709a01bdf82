//! Topic dispatcher.
//!
//! Fans one envelope out to every connection subscribed to its topic. Sends
//! never wait: a full or closed queue counts as a failure, and the failing
//! connection is torn down through the registry once the fan-out is done.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use marketstream_sdk::ws::ServerMessage;
use marketstream_sdk::{OrderBookSnapshot, Topic};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::metrics::WsMetrics;
use super::registry::ConnectionRegistry;
use crate::error::ApiError;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Connections the envelope was queued for.
    pub delivered: usize,
    /// Connections whose send failed and that were torn down.
    pub failed: usize,
}

/// Event pushed by upstream ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Last trade price for a stock.
    PriceTick {
        /// Stock code.
        stock_code: String,
        /// Trade price.
        price: Decimal,
        /// Change against the previous close.
        #[serde(default)]
        change: Option<Decimal>,
        /// Accumulated volume.
        #[serde(default)]
        volume: Option<u64>,
        /// Tick time.
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    /// Full order book snapshot for a stock.
    Orderbook {
        /// The snapshot.
        snapshot: OrderBookSnapshot,
    },
    /// A triggered alert.
    Alert {
        /// Topic the alert is published on.
        topic: Topic,
        /// Alert payload.
        #[serde(default)]
        data: Value,
    },
    /// Market open/close status change.
    MarketStatus {
        /// Market name.
        market: String,
        /// New status.
        status: String,
    },
}

impl DomainEvent {
    /// Maps the event to its topic and envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic or order book is invalid.
    pub fn into_envelope(self) -> Result<(Topic, ServerMessage), ApiError> {
        let (topic, message) = match self {
            Self::PriceTick {
                stock_code,
                price,
                change,
                volume,
                timestamp,
            } => {
                let topic = Topic::stock(stock_code.clone());
                let data = json!({
                    "stock_code": stock_code,
                    "price": price,
                    "change": change,
                    "volume": volume,
                    "timestamp": timestamp,
                });
                (topic.clone(), ServerMessage::price_update(topic, data))
            }
            Self::Orderbook { snapshot } => {
                snapshot.validate()?;
                let message = ServerMessage::orderbook_update(&snapshot)?;
                (Topic::stock(snapshot.stock_code), message)
            }
            Self::Alert { topic, data } => (topic.clone(), ServerMessage::alert(topic, data)),
            Self::MarketStatus { market, status } => {
                let topic = Topic::market(market.clone());
                let data = json!({ "market": market, "status": status });
                (topic.clone(), ServerMessage::market_status(topic, data))
            }
        };

        topic.validate()?;
        Ok((topic, message))
    }
}

/// Delivers envelopes to subscribed connections.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<WsMetrics>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<WsMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Sends `message` to every subscriber of `topic`.
    ///
    /// Never fails as a whole. Connections whose queue is full or closed are
    /// torn down, which drops all of their subscriptions.
    pub async fn dispatch(&self, topic: &Topic, message: ServerMessage) -> DispatchReport {
        let targets = self.registry.subscribers(topic).await;
        if targets.is_empty() {
            debug!("No subscribers for {}", topic);
            self.metrics.record_dispatch(0, 0);
            return DispatchReport::default();
        }

        let mut delivered = 0;
        let mut failed = Vec::new();
        for connection in targets {
            match connection.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(failure) => {
                    warn!(
                        "Send to connection {} on {} failed: {}",
                        connection.id(),
                        topic,
                        failure
                    );
                    failed.push(connection.id());
                }
            }
        }

        for connection_id in &failed {
            if let Some(released) = self.registry.disconnect(*connection_id).await {
                self.metrics.record_teardown();
                info!(
                    "Tore down connection {} ({} subscriptions released)",
                    connection_id,
                    released.len()
                );
            }
        }

        let report = DispatchReport {
            delivered,
            failed: failed.len(),
        };
        self.metrics.record_dispatch(report.delivered, report.failed);
        debug!(
            "Dispatched to {}: {} delivered, {} failed",
            topic, report.delivered, report.failed
        );
        report
    }

    /// Maps a domain event to its envelope and dispatches it.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is invalid.
    pub async fn publish(&self, event: DomainEvent) -> Result<DispatchReport, ApiError> {
        let (topic, message) = event.into_envelope()?;
        Ok(self.dispatch(&topic, message).await)
    }
}
