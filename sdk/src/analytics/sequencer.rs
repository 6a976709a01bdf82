//! Per-stock sequence tracking.
//!
//! Snapshots carry a sequence number that increases per stock code. Anything
//! at or below the last applied sequence is stale and is discarded.

use std::collections::HashMap;

/// Tracks the last applied sequence number per stock code.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    last_applied: HashMap<String, u64>,
    accepted: u64,
    dropped: u64,
}

impl Sequencer {
    /// Creates an empty sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `sequence` should be applied for `stock_code`.
    #[must_use]
    pub fn should_apply(&self, stock_code: &str, sequence: u64) -> bool {
        self.last_applied
            .get(stock_code)
            .map_or(true, |last| sequence > *last)
    }

    /// Accepts `sequence` if it is newer than the last applied one.
    ///
    /// Returns false, and leaves the state untouched, for stale or duplicate
    /// sequences.
    pub fn accept(&mut self, stock_code: &str, sequence: u64) -> bool {
        if !self.should_apply(stock_code, sequence) {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }

        self.last_applied.insert(stock_code.to_owned(), sequence);
        self.accepted = self.accepted.saturating_add(1);
        true
    }

    /// Returns the last applied sequence for `stock_code`.
    #[must_use]
    pub fn last_applied(&self, stock_code: &str) -> Option<u64> {
        self.last_applied.get(stock_code).copied()
    }

    /// Number of accepted sequences.
    #[must_use]
    pub const fn accepted_count(&self) -> u64 {
        self.accepted
    }

    /// Number of discarded sequences.
    #[must_use]
    pub const fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Forgets one stock, e.g. after its topic was unsubscribed.
    pub fn forget(&mut self, stock_code: &str) {
        self.last_applied.remove(stock_code);
    }

    /// Resets to the initial state.
    pub fn reset(&mut self) {
        self.last_applied.clear();
        self.accepted = 0;
        self.dropped = 0;
    }
}
