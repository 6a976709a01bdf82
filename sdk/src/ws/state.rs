//! Client connection state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client-observed connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No session.
    Disconnected,
    /// Opening a session.
    Connecting,
    /// Session open and subscriptions replayed.
    Connected,
    /// Tearing the session down.
    Disconnecting,
    /// Failed; waits for a retry.
    Error,
}

impl ConnectionState {
    /// Returns true if the state machine allows moving to `next`.
    ///
    /// `Connecting -> Disconnected` covers an attempt cancelled by
    /// `disconnect()`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting, Self::Disconnected)
                | (Self::Connected, Self::Disconnecting)
                | (Self::Disconnecting, Self::Disconnected)
                | (Self::Error, Self::Connecting)
                | (_, Self::Error)
        )
    }

    /// Returns true if outbound frames may be issued in this state.
    #[must_use]
    pub const fn accepts_outbound(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Error)
    }

    /// Returns true while an attempt is running or a session is open.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Notification delivered to state listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// State before the change.
    pub previous: ConnectionState,
    /// State after the change.
    pub current: ConnectionState,
    /// Error message associated with the change, if any.
    pub error: Option<String>,
}
