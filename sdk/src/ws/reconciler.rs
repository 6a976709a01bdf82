//! Subscription reconciler.
//!
//! Keeps a [`SubscriptionSink`] subscribed to exactly the topics implied by
//! the entities currently on screen. Every run diffs the applied set against
//! the desired set and issues only the difference. Runs are tagged with a
//! generation; a run overtaken by a newer one stops between calls.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::error::WsError;
use super::transport::Transport;
use crate::types::Topic;

/// Target of reconciliation calls.
#[async_trait]
pub trait SubscriptionSink: Send + Sync {
    /// Subscribes to `topic`.
    async fn subscribe_topic(&self, topic: &Topic) -> Result<(), WsError>;

    /// Unsubscribes from `topic`.
    async fn unsubscribe_topic(&self, topic: &Topic) -> Result<(), WsError>;
}

#[async_trait]
impl SubscriptionSink for Transport {
    async fn subscribe_topic(&self, topic: &Topic) -> Result<(), WsError> {
        Transport::subscribe_topic(self, topic).await
    }

    async fn unsubscribe_topic(&self, topic: &Topic) -> Result<(), WsError> {
        Transport::unsubscribe_topic(self, topic).await
    }
}

/// Calls needed to move from one topic set to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDiff {
    /// Topics in the desired set only.
    pub to_add: Vec<Topic>,
    /// Topics in the previous set only.
    pub to_remove: Vec<Topic>,
}

impl TopicDiff {
    /// Returns true if no call is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Computes `desired - previous` and `previous - desired`.
#[must_use]
pub fn diff(previous: &BTreeSet<Topic>, desired: &BTreeSet<Topic>) -> TopicDiff {
    TopicDiff {
        to_add: desired.difference(previous).cloned().collect(),
        to_remove: previous.difference(desired).cloned().collect(),
    }
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The run finished; the sink now reflects its desired set.
    Applied {
        /// Generation of the run.
        generation: u64,
        /// Topics subscribed by this run.
        added: usize,
        /// Topics unsubscribed by this run.
        removed: usize,
    },
    /// A newer run arrived; the rest of this run's calls were skipped.
    Superseded {
        /// Generation of the run.
        generation: u64,
    },
}

impl ReconcileOutcome {
    /// Returns true if the run was overtaken.
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Serializes subscription changes for one sink.
#[derive(Debug)]
pub struct SubscriptionReconciler<S> {
    sink: S,
    generation: AtomicU64,
    applied: Mutex<BTreeSet<Topic>>,
}

impl<S: SubscriptionSink> SubscriptionReconciler<S> {
    /// Creates a reconciler with nothing applied.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            generation: AtomicU64::new(0),
            applied: Mutex::new(BTreeSet::new()),
        }
    }

    /// Returns the sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the generation of the newest run.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the topics the sink has been asked to hold.
    pub async fn applied(&self) -> BTreeSet<Topic> {
        self.applied.lock().await.clone()
    }

    /// Forgets the applied set, e.g. after the transport was disconnected.
    ///
    /// Any run in progress is superseded.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.applied.lock().await.clear();
    }

    /// Moves the sink to `desired`.
    ///
    /// Removals go first so the sink never holds more than the union of the
    /// two sets. Failed unsubscribes are logged and treated as done. A topic
    /// the server rejects stays out of the applied set so the next run retries
    /// it; other subscribe failures leave it to the transport's replay.
    pub async fn reconcile(&self, desired: BTreeSet<Topic>) -> ReconcileOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut applied = self.applied.lock().await;

        let plan = diff(&applied, &desired);
        if plan.is_empty() {
            return self.finish(generation, 0, 0);
        }
        debug!(
            "Reconcile #{}: +{} -{}",
            generation,
            plan.to_add.len(),
            plan.to_remove.len()
        );

        let mut removed = 0;
        for topic in plan.to_remove {
            if !self.is_current(generation) {
                return ReconcileOutcome::Superseded { generation };
            }
            if let Err(e) = self.sink.unsubscribe_topic(&topic).await {
                warn!("Unsubscribe from {} failed: {}", topic, e);
            }
            applied.remove(&topic);
            removed += 1;
        }

        let mut added = 0;
        for topic in plan.to_add {
            if !self.is_current(generation) {
                return ReconcileOutcome::Superseded { generation };
            }
            match self.sink.subscribe_topic(&topic).await {
                Ok(()) => {}
                Err(e @ WsError::Subscription { .. }) => {
                    warn!("Subscription to {} rejected: {}", topic, e);
                    continue;
                }
                Err(e) => warn!("Subscribe to {} deferred: {}", topic, e),
            }
            applied.insert(topic);
            added += 1;
        }

        self.finish(generation, added, removed)
    }

    fn finish(&self, generation: u64, added: usize, removed: usize) -> ReconcileOutcome {
        if self.is_current(generation) {
            ReconcileOutcome::Applied {
                generation,
                added,
                removed,
            }
        } else {
            ReconcileOutcome::Superseded { generation }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Entities that currently need live data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevantEntities {
    /// Stock shown in an open detail view.
    pub open_stock: Option<String>,
    /// Stock codes across all displayed watchlists.
    pub watchlist_codes: BTreeSet<String>,
    /// Watchlist ids with a live summary on screen.
    pub watchlists: BTreeSet<String>,
    /// Market indices on screen.
    pub markets: BTreeSet<String>,
    /// Sectors on screen.
    pub sectors: BTreeSet<String>,
}

impl RelevantEntities {
    /// Creates an empty set of entities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the open detail view.
    #[must_use]
    pub fn with_open_stock(mut self, code: impl Into<String>) -> Self {
        self.open_stock = Some(code.into());
        self
    }

    /// Adds watchlist stock codes.
    #[must_use]
    pub fn with_watchlist_codes<I, C>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.watchlist_codes
            .extend(codes.into_iter().map(Into::into));
        self
    }

    /// Adds a watchlist id.
    #[must_use]
    pub fn with_watchlist(mut self, id: impl Into<String>) -> Self {
        self.watchlists.insert(id.into());
        self
    }

    /// Adds a market.
    #[must_use]
    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.markets.insert(market.into());
        self
    }

    /// Adds a sector.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sectors.insert(sector.into());
        self
    }

    /// Returns the topic set these entities need. Blank keys are skipped.
    #[must_use]
    pub fn desired_topics(&self) -> BTreeSet<Topic> {
        let stocks = self
            .open_stock
            .iter()
            .chain(&self.watchlist_codes)
            .map(Topic::stock);
        let watchlists = self.watchlists.iter().map(Topic::watchlist);
        let markets = self.markets.iter().map(Topic::market);
        let sectors = self.sectors.iter().map(Topic::sector);

        stocks
            .chain(watchlists)
            .chain(markets)
            .chain(sectors)
            .filter(|topic| topic.validate().is_ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Subscribe(Topic),
        Unsubscribe(Topic),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: std::sync::Mutex<Vec<Call>>,
        reject: Option<Topic>,
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("calls").clone()
        }

        fn effective(&self) -> BTreeSet<Topic> {
            let mut set = BTreeSet::new();
            for call in self.calls() {
                match call {
                    Call::Subscribe(t) => {
                        set.insert(t);
                    }
                    Call::Unsubscribe(t) => {
                        set.remove(&t);
                    }
                }
            }
            set
        }
    }

    #[async_trait]
    impl SubscriptionSink for RecordingSink {
        async fn subscribe_topic(&self, topic: &Topic) -> Result<(), WsError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.reject.as_ref() == Some(topic) {
                return Err(WsError::Subscription {
                    topic: topic.to_string(),
                    message: "rejected".to_string(),
                });
            }
            self.calls
                .lock()
                .expect("calls")
                .push(Call::Subscribe(topic.clone()));
            Ok(())
        }

        async fn unsubscribe_topic(&self, topic: &Topic) -> Result<(), WsError> {
            self.calls
                .lock()
                .expect("calls")
                .push(Call::Unsubscribe(topic.clone()));
            Ok(())
        }
    }

    fn stocks(codes: &[&str]) -> BTreeSet<Topic> {
        codes.iter().map(|c| Topic::stock(*c)).collect()
    }

    #[test]
    fn test_diff() {
        let plan = diff(&stocks(&["A", "B"]), &stocks(&["B", "C"]));
        assert_eq!(plan.to_add, vec![Topic::stock("C")]);
        assert_eq!(plan.to_remove, vec![Topic::stock("A")]);
        assert!(diff(&stocks(&["A"]), &stocks(&["A"])).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_issues_minimal_calls() {
        let reconciler = SubscriptionReconciler::new(RecordingSink::default());

        let first = reconciler.reconcile(stocks(&["A", "B"])).await;
        assert!(matches!(
            first,
            ReconcileOutcome::Applied { added: 2, removed: 0, .. }
        ));

        let second = reconciler.reconcile(stocks(&["B", "C"])).await;
        assert!(matches!(
            second,
            ReconcileOutcome::Applied { added: 1, removed: 1, .. }
        ));

        assert_eq!(
            reconciler.sink().calls()[2..],
            [
                Call::Unsubscribe(Topic::stock("A")),
                Call::Subscribe(Topic::stock("C")),
            ]
        );
        assert_eq!(reconciler.applied().await, stocks(&["B", "C"]));
    }

    #[tokio::test]
    async fn test_reconcile_same_set_is_noop() {
        let reconciler = SubscriptionReconciler::new(RecordingSink::default());
        reconciler.reconcile(stocks(&["A"])).await;
        reconciler.reconcile(stocks(&["A"])).await;
        assert_eq!(reconciler.sink().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_final_state_matches_direct_diff() {
        let changes = [
            stocks(&["A", "B"]),
            stocks(&["C"]),
            stocks(&["A", "C", "D"]),
            stocks(&[]),
            stocks(&["D", "E"]),
        ];

        let stepwise = SubscriptionReconciler::new(RecordingSink::default());
        for desired in changes.iter().cloned() {
            stepwise.reconcile(desired).await;
        }

        let direct = SubscriptionReconciler::new(RecordingSink::default());
        direct.reconcile(stocks(&["D", "E"])).await;

        assert_eq!(stepwise.sink().effective(), direct.sink().effective());
        assert_eq!(stepwise.applied().await, direct.applied().await);
    }

    #[tokio::test]
    async fn test_newer_run_supersedes_in_flight_run() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let sink = RecordingSink {
            gate: Some(Arc::clone(&gate)),
            ..RecordingSink::default()
        };
        let reconciler = Arc::new(SubscriptionReconciler::new(sink));

        let stale = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { reconciler.reconcile(stocks(&["A", "B", "C"])).await })
        };
        while reconciler.generation() < 1 {
            tokio::task::yield_now().await;
        }

        let fresh = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { reconciler.reconcile(stocks(&["X"])).await })
        };
        while reconciler.generation() < 2 {
            tokio::task::yield_now().await;
        }

        // Release the subscribe the stale run is parked on, then the fresh one.
        gate.notify_one();
        let stale = stale.await.expect("stale run");
        gate.notify_one();
        let fresh = fresh.await.expect("fresh run");

        assert!(stale.is_superseded());
        assert!(matches!(fresh, ReconcileOutcome::Applied { generation: 2, .. }));
        assert_eq!(reconciler.applied().await, stocks(&["X"]));
        assert_eq!(reconciler.sink().effective(), stocks(&["X"]));
    }

    #[tokio::test]
    async fn test_rejected_topic_is_retried_next_run() {
        let sink = RecordingSink {
            reject: Some(Topic::stock("BAD")),
            ..RecordingSink::default()
        };
        let reconciler = SubscriptionReconciler::new(sink);

        let outcome = reconciler.reconcile(stocks(&["BAD", "OK"])).await;

        assert!(matches!(outcome, ReconcileOutcome::Applied { added: 1, .. }));
        assert_eq!(reconciler.applied().await, stocks(&["OK"]));
    }

    #[tokio::test]
    async fn test_reset_forgets_applied_set() {
        let reconciler = SubscriptionReconciler::new(RecordingSink::default());
        reconciler.reconcile(stocks(&["A"])).await;
        reconciler.reset().await;
        assert!(reconciler.applied().await.is_empty());

        reconciler.reconcile(stocks(&["A"])).await;
        assert_eq!(reconciler.sink().calls().len(), 2);
    }

    #[test]
    fn test_relevant_entities_desired_topics() {
        let entities = RelevantEntities::new()
            .with_open_stock("005930")
            .with_watchlist_codes(["005930", "000660", ""])
            .with_watchlist("7")
            .with_market("KOSPI")
            .with_sector("semiconductors");

        let topics = entities.desired_topics();

        assert_eq!(topics.len(), 5);
        assert!(topics.contains(&Topic::stock("005930")));
        assert!(topics.contains(&Topic::stock("000660")));
        assert!(topics.contains(&Topic::watchlist("7")));
        assert!(topics.contains(&Topic::market("KOSPI")));
        assert!(topics.contains(&Topic::sector("semiconductors")));
    }

    #[test]
    fn test_relevant_entities_empty() {
        assert!(RelevantEntities::default().desired_topics().is_empty());
    }
}
