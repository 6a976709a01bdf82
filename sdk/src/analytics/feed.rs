//! Client-side order book pipeline.
//!
//! Envelope -> sequencer -> enhancer -> freeze. Only the output of the last
//! stage reaches the presentation layer.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::enhancer::OrderBookEnhancer;
use super::freeze::FreezeController;
use super::sequencer::Sequencer;
use crate::types::{EnhancedOrderBook, OrderBookSnapshot};
use crate::ws::messages::{MessageType, ServerMessage};

/// Order book updates for a set of watched stocks.
#[derive(Debug, Default)]
pub struct OrderBookFeed {
    watched: HashSet<String>,
    sequencer: Sequencer,
    enhancer: OrderBookEnhancer,
    frozen: bool,
    gates: HashMap<String, FreezeController<EnhancedOrderBook>>,
}

impl OrderBookFeed {
    /// Creates a feed with the given enhancer and nothing watched.
    #[must_use]
    pub fn new(enhancer: OrderBookEnhancer) -> Self {
        Self {
            enhancer,
            ..Self::default()
        }
    }

    /// Starts accepting updates for `stock_code`.
    pub fn watch(&mut self, stock_code: impl Into<String>) {
        self.watched.insert(stock_code.into());
    }

    /// Stops accepting updates for `stock_code`. Later updates for it are
    /// dropped.
    pub fn unwatch(&mut self, stock_code: &str) {
        self.watched.remove(stock_code);
        self.sequencer.forget(stock_code);
        self.gates.remove(stock_code);
    }

    /// Returns true if `stock_code` is watched.
    #[must_use]
    pub fn is_watching(&self, stock_code: &str) -> bool {
        self.watched.contains(stock_code)
    }

    /// Returns the sequencer.
    #[must_use]
    pub const fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Returns true while frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Processes one envelope.
    ///
    /// Returns the enhanced book to display, or `None` if the envelope is not
    /// an order book update, is for an unwatched stock, is malformed or
    /// stale, or is being held back by a freeze.
    pub fn handle(&mut self, message: &ServerMessage) -> Option<EnhancedOrderBook> {
        if message.kind != MessageType::OrderbookUpdate {
            return None;
        }

        let snapshot: OrderBookSnapshot = match serde_json::from_value(message.data.clone()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Dropping malformed order book payload: {}", e);
                return None;
            }
        };
        self.apply(snapshot)
    }

    /// Processes one snapshot. See [`OrderBookFeed::handle`].
    pub fn apply(&mut self, snapshot: OrderBookSnapshot) -> Option<EnhancedOrderBook> {
        if !self.watched.contains(&snapshot.stock_code) {
            debug!("Dropping order book for unwatched {}", snapshot.stock_code);
            return None;
        }
        if let Err(e) = snapshot.validate() {
            warn!("Dropping order book: {}", e);
            return None;
        }
        if !self.sequencer.accept(&snapshot.stock_code, snapshot.sequence) {
            debug!(
                "Dropping stale order book {}#{}",
                snapshot.stock_code, snapshot.sequence
            );
            return None;
        }

        let frozen = self.frozen;
        let enhanced = self.enhancer.enhance(snapshot);
        let gate = self
            .gates
            .entry(enhanced.snapshot.stock_code.clone())
            .or_insert_with(|| {
                let mut gate = FreezeController::new();
                if frozen {
                    gate.freeze();
                }
                gate
            });
        gate.offer(enhanced)
    }

    /// Flips the freeze flag for every watched stock.
    ///
    /// Each stock has its own gate, so coalescing is last-value-wins per
    /// stock: on unfreeze this returns at most one book per stock, the newest
    /// computed while frozen, sorted by stock code. With a single watched
    /// stock that is exactly one update.
    pub fn toggle_freeze(&mut self) -> Vec<EnhancedOrderBook> {
        self.frozen = !self.frozen;

        if self.frozen {
            self.gates.values_mut().for_each(FreezeController::freeze);
            return Vec::new();
        }

        let mut released: Vec<EnhancedOrderBook> = self
            .gates
            .values_mut()
            .filter_map(FreezeController::unfreeze)
            .collect();
        released.sort_by(|a, b| a.stock_code().cmp(b.stock_code()));
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BookLevel, ImbalanceDirection, Topic};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn snapshot(code: &str, sequence: u64, bid: i64) -> OrderBookSnapshot {
        OrderBookSnapshot::new(code, sequence, Utc::now())
            .with_bids(vec![BookLevel::new(bid, 5000)])
            .with_asks(vec![BookLevel::new(bid + 1000, 1000)])
    }

    fn update(code: &str, sequence: u64, bid: i64) -> ServerMessage {
        ServerMessage::orderbook_update(&snapshot(code, sequence, bid)).expect("envelope")
    }

    fn feed_for(codes: &[&str]) -> OrderBookFeed {
        let mut feed = OrderBookFeed::default();
        for code in codes {
            feed.watch(*code);
        }
        feed
    }

    #[test]
    fn test_handle_enhances_update() {
        let mut feed = feed_for(&["005930"]);
        let book = feed.handle(&update("005930", 1, 70_000)).expect("book");

        assert_eq!(book.best_bid, Some(Decimal::from(70_000)));
        assert_eq!(book.imbalance.direction, ImbalanceDirection::Buy);
    }

    #[test]
    fn test_stale_sequence_dropped() {
        let mut feed = feed_for(&["005930"]);
        assert!(feed.handle(&update("005930", 2, 70_000)).is_some());
        assert!(feed.handle(&update("005930", 1, 69_000)).is_none());
        assert_eq!(feed.sequencer().last_applied("005930"), Some(2));
    }

    #[test]
    fn test_unwatched_and_foreign_messages_dropped() {
        let mut feed = feed_for(&["005930"]);
        assert!(feed.handle(&update("000660", 1, 100_000)).is_none());
        assert!(feed
            .handle(&ServerMessage::price_update(
                Topic::stock("005930"),
                serde_json::json!({"price": 1})
            ))
            .is_none());

        let malformed = ServerMessage::new(MessageType::OrderbookUpdate)
            .with_topic(Topic::stock("005930"))
            .with_data(serde_json::json!({"bids": "nope"}));
        assert!(feed.handle(&malformed).is_none());
    }

    #[test]
    fn test_unwatch_drops_in_flight_updates() {
        let mut feed = feed_for(&["005930"]);
        feed.unwatch("005930");
        assert!(!feed.is_watching("005930"));
        assert!(feed.handle(&update("005930", 1, 70_000)).is_none());
    }

    #[test]
    fn test_freeze_releases_last_value_only() {
        let mut feed = feed_for(&["005930"]);
        assert!(feed.handle(&update("005930", 1, 70_000)).is_some());

        assert!(feed.toggle_freeze().is_empty());
        for seq in 2..=4 {
            assert!(feed.handle(&update("005930", seq, 70_000 + seq as i64)).is_none());
        }
        // Sequencer keeps advancing while frozen.
        assert_eq!(feed.sequencer().last_applied("005930"), Some(4));

        let released = feed.toggle_freeze();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].sequence(), 4);
        assert!(feed.toggle_freeze().is_empty());
        assert!(feed.toggle_freeze().is_empty());
    }

    #[test]
    fn test_freeze_applies_to_stocks_seen_later() {
        let mut feed = feed_for(&["005930", "000660"]);
        feed.toggle_freeze();

        assert!(feed.handle(&update("000660", 1, 100_000)).is_none());
        assert!(feed.handle(&update("005930", 1, 70_000)).is_none());

        let released = feed.toggle_freeze();
        let codes: Vec<&str> = released.iter().map(EnhancedOrderBook::stock_code).collect();
        assert_eq!(codes, vec!["000660", "005930"]);
    }
}
