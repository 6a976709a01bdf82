//! WebSocket error types.
//!
//! Provides the error taxonomy for the client transport.

use thiserror::Error;

/// WebSocket errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WsError {
    /// No bearer credential is available. No network attempt was made.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Transport-level failure or timeout.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server rejected a topic.
    #[error("subscription to {topic} rejected: {message}")]
    Subscription {
        /// Topic that was rejected.
        topic: String,
        /// Rejection reason.
        message: String,
    },

    /// Inbound payload could not be decoded.
    #[error("malformed message: {0}")]
    MessageParse(String),

    /// Server pushed an explicit error envelope.
    #[error("server error: {0}")]
    Application(String),

    /// Failed to serialize an outbound frame.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    Closed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

impl WsError {
    /// Returns true if a later `connect()` may succeed without caller action.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Closed | Self::SendFailed(_) | Self::NotConnected
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_error_display() {
        let err = WsError::Connection("timeout".to_string());
        assert_eq!(err.to_string(), "connection failed: timeout");
    }

    #[test]
    fn test_ws_error_authentication_required() {
        assert_eq!(
            WsError::AuthenticationRequired.to_string(),
            "Authentication required"
        );
        assert!(!WsError::AuthenticationRequired.is_recoverable());
    }

    #[test]
    fn test_ws_error_subscription() {
        let err = WsError::Subscription {
            topic: "stock:".to_string(),
            message: "empty key".to_string(),
        };
        assert_eq!(err.to_string(), "subscription to stock: rejected: empty key");
    }

    #[test]
    fn test_ws_error_recoverable() {
        assert!(WsError::Connection("reset".to_string()).is_recoverable());
        assert!(WsError::Closed.is_recoverable());
        assert!(!WsError::Application("maintenance".to_string()).is_recoverable());
    }
}
