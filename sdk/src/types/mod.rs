//! Core types shared by the Marketstream server and clients.
//!
//! - [`topic`]: subscribable topic identifiers
//! - [`book`]: order book snapshots and derived analytics
//! - [`watchlist`]: saved stock lists

pub mod book;
pub mod topic;
pub mod watchlist;

pub use book::{BookLevel, EnhancedOrderBook, Imbalance, ImbalanceDirection, OrderBookSnapshot};
pub use topic::{Topic, TopicType};
pub use watchlist::Watchlist;
