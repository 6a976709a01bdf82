//! Per-connection handle.
//!
//! A [`Connection`] is what the registry keeps for one live socket: its id,
//! the bounded queue feeding the socket writer, and the signal used to ask
//! the socket task to shut down.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use marketstream_sdk::ws::ServerMessage;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};

/// Global connection ID counter.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique connection ID.
#[must_use]
pub fn next_connection_id() -> u64 {
    CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Why a non-blocking send did not reach the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The queue is full; the consumer is too slow.
    Full,
    /// The socket writer is gone.
    Closed,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "outbound queue full"),
            Self::Closed => write!(f, "outbound queue closed"),
        }
    }
}

/// Handle to one live WebSocket session.
///
/// Cheap to clone; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    sender: mpsc::Sender<ServerMessage>,
    closed: Arc<Notify>,
    principal: Option<String>,
}

impl Connection {
    /// Creates a connection with a fresh id.
    #[must_use]
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: next_connection_id(),
            sender,
            closed: Arc::new(Notify::new()),
            principal: None,
        }
    }

    /// Records the authenticated subject.
    #[must_use]
    pub fn with_principal(mut self, subject: impl Into<String>) -> Self {
        self.principal = Some(subject.into());
        self
    }

    /// Returns the connection ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the authenticated subject, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Queues a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns the reason the message could not be queued.
    pub fn try_send(&self, message: ServerMessage) -> Result<(), SendFailure> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Full,
            TrySendError::Closed(_) => SendFailure::Closed,
        })
    }

    /// Queues a message, waiting for room in the queue.
    ///
    /// Used for replies to the connection's own requests; fan-out uses
    /// [`Connection::try_send`].
    ///
    /// # Errors
    ///
    /// Returns `SendFailure::Closed` if the socket writer is gone.
    pub async fn send(&self, message: ServerMessage) -> Result<(), SendFailure> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SendFailure::Closed)
    }

    /// Returns true once the socket writer has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Asks the socket task to shut down.
    pub fn close(&self) {
        self.closed.notify_one();
    }

    /// Completes once [`Connection::close`] has been called.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }
}
