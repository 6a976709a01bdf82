//! Connection registry.
//!
//! The authoritative connection <-> topic index. Both directions live behind
//! one `RwLock` so every write updates them together, while dispatch only
//! needs a read lock.

use std::collections::{HashMap, HashSet};

use marketstream_sdk::Topic;
use tokio::sync::RwLock;
use tracing::debug;

use super::connection::Connection;
use crate::error::ApiError;

#[derive(Debug)]
struct Entry {
    connection: Connection,
    topics: HashSet<Topic>,
}

#[derive(Debug, Default)]
struct Index {
    by_topic: HashMap<Topic, HashSet<u64>>,
    by_connection: HashMap<u64, Entry>,
}

impl Index {
    fn link(&mut self, connection_id: u64, topic: Topic) -> Result<bool, ApiError> {
        let entry = self
            .by_connection
            .get_mut(&connection_id)
            .ok_or(ApiError::ConnectionNotFound(connection_id))?;

        if !entry.topics.insert(topic.clone()) {
            return Ok(false);
        }
        self.by_topic.entry(topic).or_default().insert(connection_id);
        Ok(true)
    }

    fn unlink_topic(&mut self, topic: &Topic, connection_id: u64) {
        if let Some(connections) = self.by_topic.get_mut(topic) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                self.by_topic.remove(topic);
            }
        }
    }
}

/// Tracks live connections and their topic subscriptions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    index: RwLock<Index>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection with no subscriptions.
    ///
    /// Returns false if the id is already registered.
    pub async fn register(&self, connection: Connection) -> bool {
        let mut index = self.index.write().await;
        let id = connection.id();
        if index.by_connection.contains_key(&id) {
            return false;
        }
        index.by_connection.insert(
            id,
            Entry {
                connection,
                topics: HashSet::new(),
            },
        );
        true
    }

    /// Subscribes a connection to a topic.
    ///
    /// Returns true if the subscription is new.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ConnectionNotFound` if the connection is gone.
    pub async fn subscribe(&self, connection_id: u64, topic: Topic) -> Result<bool, ApiError> {
        self.index.write().await.link(connection_id, topic)
    }

    /// Subscribes a connection to several topics under one write lock.
    ///
    /// Returns the number of new subscriptions.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ConnectionNotFound` if the connection is gone.
    pub async fn subscribe_many(
        &self,
        connection_id: u64,
        topics: impl IntoIterator<Item = Topic>,
    ) -> Result<usize, ApiError> {
        let mut index = self.index.write().await;
        let mut added = 0;
        for topic in topics {
            if index.link(connection_id, topic)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Unsubscribes a connection from a topic.
    ///
    /// Returns true if a subscription was removed. Unknown pairs are a no-op.
    pub async fn unsubscribe(&self, connection_id: u64, topic: &Topic) -> bool {
        let mut index = self.index.write().await;
        let removed = index
            .by_connection
            .get_mut(&connection_id)
            .is_some_and(|entry| entry.topics.remove(topic));
        if removed {
            index.unlink_topic(topic, connection_id);
        }
        removed
    }

    /// Removes a connection and every subscription it held, then signals its
    /// socket task to close.
    ///
    /// Returns the released topics, or `None` if the connection was already
    /// gone.
    pub async fn disconnect(&self, connection_id: u64) -> Option<Vec<Topic>> {
        let entry = {
            let mut index = self.index.write().await;
            let entry = index.by_connection.remove(&connection_id)?;
            for topic in &entry.topics {
                index.unlink_topic(topic, connection_id);
            }
            entry
        };

        entry.connection.close();
        debug!(
            "Connection {} removed with {} subscriptions",
            connection_id,
            entry.topics.len()
        );
        Some(entry.topics.into_iter().collect())
    }

    /// Returns handles for every connection subscribed to `topic`.
    pub async fn subscribers(&self, topic: &Topic) -> Vec<Connection> {
        let index = self.index.read().await;
        index
            .by_topic
            .get(topic)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| index.by_connection.get(id))
                    .map(|entry| entry.connection.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of subscribers for a topic.
    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        let index = self.index.read().await;
        index.by_topic.get(topic).map_or(0, HashSet::len)
    }

    /// Returns true if the connection is subscribed to the topic.
    pub async fn is_subscribed(&self, connection_id: u64, topic: &Topic) -> bool {
        let index = self.index.read().await;
        index
            .by_connection
            .get(&connection_id)
            .is_some_and(|entry| entry.topics.contains(topic))
    }

    /// Returns the topics a connection holds.
    pub async fn topics_of(&self, connection_id: u64) -> Vec<Topic> {
        let index = self.index.read().await;
        index
            .by_connection
            .get(&connection_id)
            .map(|entry| entry.topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.index.read().await.by_connection.len()
    }

    /// Returns the number of topics with at least one subscriber.
    pub async fn topic_count(&self) -> usize {
        self.index.read().await.by_topic.len()
    }

    /// Returns the total number of subscriptions.
    pub async fn total_subscriptions(&self) -> usize {
        let index = self.index.read().await;
        index.by_connection.values().map(|e| e.topics.len()).sum()
    }
}
