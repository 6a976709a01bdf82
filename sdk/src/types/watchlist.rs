//! Watchlist types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::topic::Topic;

/// A user's saved list of stocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watchlist {
    /// Watchlist id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Stock codes in display order.
    #[serde(default)]
    pub stock_codes: Vec<String>,

    /// Last modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Watchlist {
    /// Creates an empty watchlist.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stock_codes: Vec::new(),
            updated_at: None,
        }
    }

    /// Sets the stock codes.
    #[must_use]
    pub fn with_stock_codes<I, C>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.stock_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the topic for this watchlist's summary stream.
    #[must_use]
    pub fn topic(&self) -> Topic {
        Topic::watchlist(self.id.clone())
    }

    /// Returns true if `code` is on the list.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.stock_codes.iter().any(|c| c == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchlist_deserialize_minimal() {
        let list: Watchlist =
            serde_json::from_str(r#"{"id":"7","name":"Chips"}"#).expect("watchlist");
        assert!(list.stock_codes.is_empty());
        assert_eq!(list.topic(), Topic::watchlist("7"));
    }

    #[test]
    fn test_watchlist_contains() {
        let list = Watchlist::new("7", "Chips").with_stock_codes(["005930", "000660"]);
        assert!(list.contains("000660"));
        assert!(!list.contains("035420"));
    }
}
