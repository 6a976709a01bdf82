//! Topic types.
//!
//! A topic identifies a subscribable stream: a single stock, the whole
//! market, a sector, or a personal watchlist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Kind of subscribable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    /// A single instrument, keyed by stock code.
    Stock,
    /// The whole market, keyed by market id (e.g. `KOSPI`).
    Market,
    /// A sector, keyed by sector name.
    Sector,
    /// A user watchlist, keyed by watchlist id.
    Watchlist,
}

impl TopicType {
    /// Returns the topic type as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Market => "market",
            Self::Sector => "sector",
            Self::Watchlist => "watchlist",
        }
    }
}

impl fmt::Display for TopicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock" => Ok(Self::Stock),
            "market" => Ok(Self::Market),
            "sector" => Ok(Self::Sector),
            "watchlist" => Ok(Self::Watchlist),
            other => Err(SdkError::UnknownTopicType(other.to_string())),
        }
    }
}

/// A subscribable resource identifier.
///
/// Topics are immutable values compared structurally, so they can be used
/// directly as map keys on both the server and the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Topic {
    /// Topic type.
    #[serde(rename = "type")]
    pub topic_type: TopicType,

    /// Topic key (stock code, market id, sector name or watchlist id).
    pub key: String,
}

impl Topic {
    /// Creates a new topic.
    #[must_use]
    pub fn new(topic_type: TopicType, key: impl Into<String>) -> Self {
        Self {
            topic_type,
            key: key.into(),
        }
    }

    /// Creates a stock topic.
    #[must_use]
    pub fn stock(code: impl Into<String>) -> Self {
        Self::new(TopicType::Stock, code)
    }

    /// Creates a market topic.
    #[must_use]
    pub fn market(market: impl Into<String>) -> Self {
        Self::new(TopicType::Market, market)
    }

    /// Creates a sector topic.
    #[must_use]
    pub fn sector(sector: impl Into<String>) -> Self {
        Self::new(TopicType::Sector, sector)
    }

    /// Creates a watchlist topic.
    #[must_use]
    pub fn watchlist(id: impl Into<String>) -> Self {
        Self::new(TopicType::Watchlist, id)
    }

    /// Parses a topic string of the form `type:key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is missing, the type is unknown or
    /// the key is empty.
    pub fn parse(topic: &str) -> Result<Self, SdkError> {
        let (topic_type, key) = topic
            .split_once(':')
            .ok_or_else(|| SdkError::InvalidTopic(topic.to_string()))?;

        let topic = Self::new(topic_type.parse()?, key);
        topic.validate()?;
        Ok(topic)
    }

    /// Validates the topic key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or contains whitespace.
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.key.is_empty() || self.key.chars().any(char::is_whitespace) {
            return Err(SdkError::InvalidTopic(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic_type, self.key)
    }
}

impl FromStr for Topic {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
