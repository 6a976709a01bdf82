//! Marketstream SDK - client library for the Marketstream fan-out server.
//!
//! This crate holds the types shared by the server and its clients, the
//! WebSocket client transport, and the client-side order book analytics.
//!
//! # Core Types
//!
//! - [`Topic`], [`TopicType`] — Subscribable resource identifiers
//! - [`OrderBookSnapshot`], [`BookLevel`] — Raw order book data
//! - [`EnhancedOrderBook`], [`Imbalance`] — Display-ready analytics
//! - [`Watchlist`] — Saved stock list
//!
//! # Modules
//!
//! - [`ws`] — Transport, subscription reconciler and wire envelope
//! - [`analytics`] — Sequencer, enhancer and freeze controller
//! - [`client`] — Watchlist service HTTP client
//!
//! # Example
//!
//! ```rust
//! use marketstream_sdk::{BookLevel, OrderBookSnapshot, Topic};
//! use marketstream_sdk::analytics::OrderBookEnhancer;
//!
//! let topic: Topic = "stock:005930".parse().unwrap();
//! assert_eq!(topic, Topic::stock("005930"));
//!
//! let snapshot = OrderBookSnapshot::new("005930", 1, chrono::Utc::now())
//!     .with_bids(vec![BookLevel::new(70_000, 1000)])
//!     .with_asks(vec![BookLevel::new(71_000, 1000)]);
//! let book = OrderBookEnhancer::default().enhance(snapshot);
//! assert_eq!(book.spread, Some(1000.into()));
//! ```

pub mod analytics;
pub mod client;
pub mod error;
pub mod types;
pub mod ws;

pub use error::SdkError;
pub use types::{
    BookLevel, EnhancedOrderBook, Imbalance, ImbalanceDirection, OrderBookSnapshot, Topic,
    TopicType, Watchlist,
};
