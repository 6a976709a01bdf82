//! Order book analytics.
//!
//! - [`Sequencer`] discards stale snapshots per stock code.
//! - [`OrderBookEnhancer`] derives spread, mid price and imbalance.
//! - [`FreezeController`] holds back display updates without touching
//!   subscriptions.
//! - [`OrderBookFeed`] chains the three for a set of watched stocks.

pub mod enhancer;
pub mod feed;
pub mod freeze;
pub mod sequencer;

pub use enhancer::{EnhancerConfig, OrderBookEnhancer};
pub use feed::OrderBookFeed;
pub use freeze::FreezeController;
pub use sequencer::Sequencer;
