//! Client transport.
//!
//! One logical session to the server. The transport remembers the active
//! topic set so that every (re)connection replays it as a single batch
//! before observers see `connected`.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::config::WsConfig;
use super::connector::{Connector, CredentialProvider, Link, TungsteniteConnector};
use super::error::WsError;
use super::listeners::{ListenerHandle, Listeners};
use super::messages::{ClientMessage, MessageType, ServerMessage};
use super::reconnect::Backoff;
use super::state::{ConnectionState, StateChange};
use crate::types::{Topic, TopicType};

#[derive(Debug)]
struct Session {
    state: ConnectionState,
    active: BTreeSet<Topic>,
    outbound: Option<mpsc::Sender<String>>,
    last_error: Option<WsError>,
}

struct Inner {
    config: WsConfig,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialProvider>,
    session: Mutex<Session>,
    /// Bumped on every connect attempt and every disconnect; tasks tagged
    /// with an older value stop touching the session.
    generation: AtomicU64,
    message_listeners: Listeners<ServerMessage>,
    state_listeners: Listeners<StateChange>,
}

impl Inner {
    fn transition(&self, session: &mut Session, next: ConnectionState, error: Option<&WsError>) {
        let previous = session.state;
        if !previous.can_transition_to(next) {
            warn!("Ignoring invalid transition {} -> {}", previous, next);
            return;
        }

        session.state = next;
        debug!("Connection state {} -> {}", previous, next);
        self.state_listeners.emit(&StateChange {
            previous,
            current: next,
            error: error.map(ToString::to_string),
        });
    }

    fn fail(&self, session: &mut Session, error: WsError) {
        warn!("Transport error: {}", error);
        session.outbound = None;
        self.transition(session, ConnectionState::Error, Some(&error));
        session.last_error = Some(error);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Client transport for one logical session.
///
/// Cloning is cheap and yields a handle to the same session. Call
/// [`Transport::disconnect`] before dropping the last handle so the server
/// releases its subscriptions.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("url", &self.inner.config.url)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Creates a transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: WsConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, WsError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                connector,
                credentials,
                session: Mutex::new(Session {
                    state: ConnectionState::Disconnected,
                    active: BTreeSet::new(),
                    outbound: None,
                    last_error: None,
                }),
                generation: AtomicU64::new(0),
                message_listeners: Listeners::new(),
                state_listeners: Listeners::new(),
            }),
        })
    }

    /// Creates a transport that talks to the server over `tokio-tungstenite`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(
        config: WsConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, WsError> {
        let connector = Arc::new(TungsteniteConnector::new(config.queue_capacity));
        Self::new(config, connector, credentials)
    }

    /// Returns the transport configuration.
    #[must_use]
    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.session.lock().await.state
    }

    /// Returns true if connected.
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Returns the topics this session wants, in order.
    pub async fn active_topics(&self) -> Vec<Topic> {
        self.inner.session.lock().await.active.iter().cloned().collect()
    }

    /// Returns the most recent error, if any.
    pub async fn last_error(&self) -> Option<WsError> {
        self.inner.session.lock().await.last_error.clone()
    }

    /// Registers a message observer.
    pub fn on_message<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.inner.message_listeners.register(listener)
    }

    /// Registers a connection state observer.
    pub fn on_state_change<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.state_listeners.register(listener)
    }

    /// Opens the session.
    ///
    /// Does nothing if a session is already connecting or connected. Without
    /// a stored credential the state moves straight to `error` and no network
    /// attempt is made.
    ///
    /// # Errors
    ///
    /// Returns `WsError::AuthenticationRequired` without a credential,
    /// `WsError::Closed` while a disconnect is still in progress or when the
    /// attempt is cancelled, and `WsError::Connection` once every attempt has
    /// failed.
    pub async fn connect(&self) -> Result<(), WsError> {
        let (generation, token) = {
            let mut session = self.inner.session.lock().await;
            if session.state.is_active() {
                debug!("connect() ignored while {}", session.state);
                return Ok(());
            }
            if session.state == ConnectionState::Disconnecting {
                return Err(WsError::Closed);
            }

            let token = match self.inner.credentials.bearer_token() {
                Some(token) if !token.is_empty() => token,
                _ => {
                    self.inner
                        .fail(&mut session, WsError::AuthenticationRequired);
                    return Err(WsError::AuthenticationRequired);
                }
            };

            self.inner
                .transition(&mut session, ConnectionState::Connecting, None);
            (self.inner.next_generation(), token)
        };

        match self.open_with_backoff(generation, &token).await {
            Ok(link) => self.establish(generation, link).await,
            Err(err) => {
                let mut session = self.inner.session.lock().await;
                if self.inner.is_current(generation)
                    && session.state == ConnectionState::Connecting
                {
                    self.inner.fail(&mut session, err.clone());
                }
                Err(err)
            }
        }
    }

    async fn open_with_backoff(&self, generation: u64, token: &str) -> Result<Link, WsError> {
        let config = &self.inner.config;
        let mut backoff = Backoff::from_config(config);

        loop {
            let attempt = tokio::time::timeout(
                config.connect_timeout,
                self.inner.connector.open(&config.url, token),
            )
            .await;

            let err = match attempt {
                Ok(Ok(link)) => return Ok(link),
                Ok(Err(e)) if !e.is_recoverable() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => WsError::Connection(format!(
                    "connect timed out after {:?}",
                    config.connect_timeout
                )),
            };

            let Some(delay) = backoff.next_delay() else {
                return Err(match err {
                    WsError::Connection(_) => err,
                    other => WsError::Connection(other.to_string()),
                });
            };

            warn!(
                "Connect attempt {} failed: {}; retrying in {:?}",
                backoff.retries(),
                err,
                delay
            );
            tokio::time::sleep(delay).await;

            if !self.inner.is_current(generation) {
                return Err(WsError::Closed);
            }
        }
    }

    async fn establish(&self, generation: u64, link: Link) -> Result<(), WsError> {
        let Link { outbound, inbound } = link;
        let mut session = self.inner.session.lock().await;

        if !self.inner.is_current(generation) || session.state != ConnectionState::Connecting {
            debug!("Dropping link from a cancelled connect attempt");
            return Err(WsError::Closed);
        }

        if !session.active.is_empty() {
            let batch = ClientMessage::subscribe_batch(session.active.iter().cloned());
            if let Err(err) = send_frame(&outbound, &batch) {
                self.inner.fail(&mut session, err.clone());
                return Err(err);
            }
            info!("Replayed {} subscriptions", session.active.len());
        }

        let heartbeat_sender = outbound.downgrade();
        session.outbound = Some(outbound);
        session.last_error = None;
        self.inner
            .transition(&mut session, ConnectionState::Connected, None);
        drop(session);

        tokio::spawn(self.clone().read_loop(generation, inbound));
        tokio::spawn(heartbeat(
            Arc::downgrade(&self.inner),
            generation,
            heartbeat_sender,
        ));

        info!("Connected to {}", self.inner.config.url);
        Ok(())
    }

    async fn read_loop(
        self,
        generation: u64,
        mut inbound: mpsc::Receiver<Result<String, WsError>>,
    ) {
        while let Some(frame) = inbound.recv().await {
            if !self.inner.is_current(generation) {
                return;
            }
            match frame {
                Ok(text) => self.handle_frame(&text).await,
                Err(err) => {
                    self.link_failed(generation, err).await;
                    return;
                }
            }
        }

        self.link_failed(
            generation,
            WsError::Connection("server closed the connection".to_string()),
        )
        .await;
    }

    async fn handle_frame(&self, text: &str) {
        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("{}", WsError::MessageParse(e.to_string()));
                return;
            }
        };

        if message.kind == MessageType::Error {
            self.surface_error(&message).await;
        } else if message.kind.is_data() {
            if let Some(topic) = &message.topic {
                if !self.inner.session.lock().await.active.contains(topic) {
                    debug!("Dropping {:?} for unsubscribed topic {}", message.kind, topic);
                    return;
                }
            }
        } else {
            debug!("Received {:?}", message.kind);
        }

        self.inner.message_listeners.emit(&message);
    }

    async fn surface_error(&self, message: &ServerMessage) {
        let text = message
            .error_message()
            .unwrap_or("unspecified server error")
            .to_string();
        let error = match &message.topic {
            Some(topic) => WsError::Subscription {
                topic: topic.to_string(),
                message: text,
            },
            None => WsError::Application(text),
        };

        warn!("{}", error);
        let mut session = self.inner.session.lock().await;
        session.last_error = Some(error.clone());
        let state = session.state;
        self.inner.state_listeners.emit(&StateChange {
            previous: state,
            current: state,
            error: Some(error.to_string()),
        });
    }

    async fn link_failed(&self, generation: u64, error: WsError) {
        let error = match error {
            WsError::Connection(_) => error,
            other => WsError::Connection(other.to_string()),
        };

        {
            let mut session = self.inner.session.lock().await;
            if !self.inner.is_current(generation) || session.state != ConnectionState::Connected {
                return;
            }
            self.inner.fail(&mut session, error);
        }

        if self.inner.config.auto_reconnect {
            tokio::spawn(self.clone().reconnect_in_background());
        }
    }

    fn reconnect_in_background(self) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Err(e) = self.connect().await {
                warn!("Background reconnect failed: {}", e);
            }
        })
    }

    /// Subscribes to a topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic is invalid or the frame cannot be sent.
    pub async fn subscribe(
        &self,
        topic_type: TopicType,
        topic_key: impl Into<String>,
    ) -> Result<(), WsError> {
        self.subscribe_topic(&Topic::new(topic_type, topic_key))
            .await
    }

    /// Subscribes to a topic.
    ///
    /// Before the session is connected the topic is only remembered; it goes
    /// out with the replay batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic is invalid or the frame cannot be
    /// queued; a full outbound queue is `WsError::SendFailed`. The topic stays
    /// remembered either way.
    pub async fn subscribe_topic(&self, topic: &Topic) -> Result<(), WsError> {
        topic.validate().map_err(|e| WsError::Subscription {
            topic: topic.to_string(),
            message: e.to_string(),
        })?;

        let mut session = self.inner.session.lock().await;
        if !session.active.insert(topic.clone()) {
            return Ok(());
        }

        match (&session.outbound, session.state) {
            (Some(outbound), state) if state.accepts_outbound() => {
                send_frame(outbound, &ClientMessage::subscribe(topic))?;
                debug!("Subscribed to {}", topic);
            }
            (_, state) => debug!("Queued subscription to {} while {}", topic, state),
        }
        Ok(())
    }

    /// Unsubscribes from a topic. Unknown topics are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be sent.
    pub async fn unsubscribe(
        &self,
        topic_type: TopicType,
        topic_key: impl Into<String>,
    ) -> Result<(), WsError> {
        self.unsubscribe_topic(&Topic::new(topic_type, topic_key))
            .await
    }

    /// Unsubscribes from a topic. Unknown topics are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be sent.
    pub async fn unsubscribe_topic(&self, topic: &Topic) -> Result<(), WsError> {
        let mut session = self.inner.session.lock().await;
        if !session.active.remove(topic) {
            return Ok(());
        }

        match (&session.outbound, session.state) {
            (Some(outbound), state) if state.accepts_outbound() => {
                send_frame(outbound, &ClientMessage::unsubscribe(topic))?;
                debug!("Unsubscribed from {}", topic);
            }
            _ => {}
        }
        Ok(())
    }

    /// Closes the session.
    ///
    /// Every active topic is unsubscribed before the link is released. An
    /// attempt still in flight is cancelled. The session lock is not held
    /// while unsubscribe frames wait for room; the whole release is bounded
    /// by the connect timeout.
    ///
    /// # Errors
    ///
    /// Currently infallible; unsubscribe send failures are logged.
    pub async fn disconnect(&self) -> Result<(), WsError> {
        let (topics, outbound) = {
            let mut session = self.inner.session.lock().await;
            self.inner.next_generation();
            let topics = std::mem::take(&mut session.active);
            let outbound = session.outbound.take();

            match session.state {
                ConnectionState::Connected => {
                    self.inner
                        .transition(&mut session, ConnectionState::Disconnecting, None);
                    (topics, outbound)
                }
                ConnectionState::Connecting => {
                    self.inner
                        .transition(&mut session, ConnectionState::Disconnected, None);
                    info!("Connect attempt cancelled");
                    return Ok(());
                }
                state => {
                    debug!("disconnect() while {}", state);
                    return Ok(());
                }
            }
        };

        if let Some(outbound) = outbound {
            let timeout = self.inner.config.connect_timeout;
            if tokio::time::timeout(timeout, release_topics(&outbound, &topics))
                .await
                .is_err()
            {
                warn!("Unsubscribe during disconnect timed out after {:?}", timeout);
            }
        }

        let mut session = self.inner.session.lock().await;
        if session.state == ConnectionState::Disconnecting {
            self.inner
                .transition(&mut session, ConnectionState::Disconnected, None);
        }
        info!("Disconnected, released {} subscriptions", topics.len());

        Ok(())
    }
}

/// Queues one frame without waiting; a full queue means the link is stalled.
fn send_frame(outbound: &mpsc::Sender<String>, message: &ClientMessage) -> Result<(), WsError> {
    let frame =
        serde_json::to_string(message).map_err(|e| WsError::Serialization(e.to_string()))?;
    outbound.try_send(frame).map_err(|e| match e {
        TrySendError::Full(_) => WsError::SendFailed("outbound queue full".to_string()),
        TrySendError::Closed(_) => WsError::SendFailed("link closed".to_string()),
    })
}

async fn release_topics(outbound: &mpsc::Sender<String>, topics: &BTreeSet<Topic>) {
    for topic in topics {
        let Ok(frame) = serde_json::to_string(&ClientMessage::unsubscribe(topic)) else {
            continue;
        };
        if outbound.send(frame).await.is_err() {
            warn!("Unsubscribe from {} during disconnect failed: link closed", topic);
            break;
        }
    }
}

async fn heartbeat(
    inner: Weak<Inner>,
    generation: u64,
    outbound: mpsc::WeakSender<String>,
) {
    let Ok(ping) = serde_json::to_string(&ClientMessage::Ping) else {
        return;
    };
    let Some(interval) = inner.upgrade().map(|i| i.config.heartbeat_interval) else {
        return;
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let current = inner
            .upgrade()
            .is_some_and(|inner| inner.is_current(generation));
        if !current {
            break;
        }

        let Some(sender) = outbound.upgrade() else {
            break;
        };
        if sender.send(ping.clone()).await.is_err() {
            break;
        }
    }
}
