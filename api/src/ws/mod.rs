//! WebSocket module for real-time fan-out.
//!
//! Clients open an authenticated socket and subscribe to topics. Upstream
//! events are routed through the [`Dispatcher`] to every connection the
//! [`ConnectionRegistry`] holds for the event's topic.
//!
//! # Topics
//!
//! - `stock:{code}` — price ticks and order book snapshots
//! - `market:{name}` — market status
//! - `sector:{name}` — sector alerts
//! - `watchlist:{id}` — watchlist alerts
//!
//! # Message Types
//!
//! - `subscribe` / `unsubscribe` / `subscribe_batch` — subscription requests
//! - `subscribed` / `unsubscribed` — confirmations
//! - `price_update` / `orderbook_update` / `market_status` / `alert` — data
//! - `error` — rejected frames or topics

pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod metrics;
pub mod registry;

pub use connection::{Connection, SendFailure};
pub use dispatcher::{DispatchReport, Dispatcher, DomainEvent};
pub use handler::{ws_handler, WsParams};
pub use metrics::{WsMetrics, WsMetricsSnapshot};
pub use registry::ConnectionRegistry;
