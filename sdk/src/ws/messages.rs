//! WebSocket message types.
//!
//! Defines the wire envelope pushed by the server and the frames a client
//! sends to manage its subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SdkError;
use crate::types::{OrderBookSnapshot, Topic, TopicType};

/// Envelope type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Session established.
    Connected,
    /// Subscription confirmed.
    Subscribed,
    /// Unsubscription confirmed.
    Unsubscribed,
    /// Price tick.
    PriceUpdate,
    /// Order book snapshot.
    OrderbookUpdate,
    /// Market open/close status.
    MarketStatus,
    /// Triggered alert.
    Alert,
    /// Server-side error.
    Error,
    /// Heartbeat response.
    Pong,
}

impl MessageType {
    /// Returns true for envelopes that carry topic data.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(
            self,
            Self::PriceUpdate | Self::OrderbookUpdate | Self::MarketStatus | Self::Alert
        )
    }
}

/// Error body attached to `error` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub message: String,
}

/// Server-to-client envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Envelope type.
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Topic the envelope belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,

    /// Payload.
    #[serde(default)]
    pub data: Value,

    /// Per-topic sequence number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,

    /// Time the envelope was produced.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Error details for `error` envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ServerMessage {
    /// Creates an envelope of the given type with an empty payload.
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            topic: None,
            data: Value::Null,
            sequence: None,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Sets the topic.
    #[must_use]
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Sets the sequence number.
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Creates a connected message carrying the connection id.
    #[must_use]
    pub fn connected(connection_id: u64) -> Self {
        Self::new(MessageType::Connected)
            .with_data(serde_json::json!({ "connection_id": connection_id }))
    }

    /// Creates a subscribed message.
    #[must_use]
    pub fn subscribed(topic: Topic) -> Self {
        Self::new(MessageType::Subscribed).with_topic(topic)
    }

    /// Creates an unsubscribed message.
    #[must_use]
    pub fn unsubscribed(topic: Topic) -> Self {
        Self::new(MessageType::Unsubscribed).with_topic(topic)
    }

    /// Creates a price update message.
    #[must_use]
    pub fn price_update(topic: Topic, data: Value) -> Self {
        Self::new(MessageType::PriceUpdate)
            .with_topic(topic)
            .with_data(data)
    }

    /// Creates an order book update for the snapshot's stock topic.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Serialization` if the snapshot cannot be encoded.
    pub fn orderbook_update(snapshot: &OrderBookSnapshot) -> Result<Self, SdkError> {
        let data =
            serde_json::to_value(snapshot).map_err(|e| SdkError::Serialization(e.to_string()))?;
        Ok(Self::new(MessageType::OrderbookUpdate)
            .with_topic(Topic::stock(snapshot.stock_code.clone()))
            .with_data(data)
            .with_sequence(snapshot.sequence))
    }

    /// Creates a market status message.
    #[must_use]
    pub fn market_status(topic: Topic, data: Value) -> Self {
        Self::new(MessageType::MarketStatus)
            .with_topic(topic)
            .with_data(data)
    }

    /// Creates an alert message.
    #[must_use]
    pub fn alert(topic: Topic, data: Value) -> Self {
        Self::new(MessageType::Alert).with_topic(topic).with_data(data)
    }

    /// Creates an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let mut msg = Self::new(MessageType::Error);
        msg.error = Some(ErrorBody {
            message: message.into(),
        });
        msg
    }

    /// Creates an error message scoped to a topic.
    #[must_use]
    pub fn topic_error(topic: Topic, message: impl Into<String>) -> Self {
        Self::error(message).with_topic(topic)
    }

    /// Creates a pong message.
    #[must_use]
    pub fn pong() -> Self {
        Self::new(MessageType::Pong)
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a topic.
    Subscribe {
        /// Topic type.
        topic_type: TopicType,
        /// Topic key.
        topic_key: String,
    },

    /// Unsubscribe from a topic.
    Unsubscribe {
        /// Topic type.
        topic_type: TopicType,
        /// Topic key.
        topic_key: String,
    },

    /// Subscribe to several topics at once.
    SubscribeBatch {
        /// Topics to subscribe to.
        topics: Vec<Topic>,
    },

    /// Ping message for keepalive.
    Ping,
}

impl ClientMessage {
    /// Creates a subscribe frame.
    #[must_use]
    pub fn subscribe(topic: &Topic) -> Self {
        Self::Subscribe {
            topic_type: topic.topic_type,
            topic_key: topic.key.clone(),
        }
    }

    /// Creates an unsubscribe frame.
    #[must_use]
    pub fn unsubscribe(topic: &Topic) -> Self {
        Self::Unsubscribe {
            topic_type: topic.topic_type,
            topic_key: topic.key.clone(),
        }
    }

    /// Creates a batch subscribe frame.
    #[must_use]
    pub fn subscribe_batch(topics: impl IntoIterator<Item = Topic>) -> Self {
        Self::SubscribeBatch {
            topics: topics.into_iter().collect(),
        }
    }

    /// Returns the single topic addressed by this frame.
    #[must_use]
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Self::Subscribe {
                topic_type,
                topic_key,
            }
            | Self::Unsubscribe {
                topic_type,
                topic_key,
            } => Some(Topic::new(*topic_type, topic_key.clone())),
            Self::SubscribeBatch { .. } | Self::Ping => None,
        }
    }
}
