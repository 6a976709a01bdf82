//! WebSocket client for real-time market data.
//!
//! A [`Transport`] owns one logical session to the streaming server and
//! replays its subscriptions after every reconnect. A
//! [`SubscriptionReconciler`] sits in front of it so that every change to
//! the on-screen entities turns into a minimal subscribe/unsubscribe diff.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marketstream_sdk::ws::{RelevantEntities, StaticCredential, SubscriptionReconciler, Transport, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Transport::with_config(
//!         WsConfig::new("ws://127.0.0.1:8080/ws"),
//!         Arc::new(StaticCredential::new("token")),
//!     )?;
//!     let _updates = transport.on_message(|msg| println!("{:?}", msg));
//!     transport.connect().await?;
//!
//!     let reconciler = SubscriptionReconciler::new(transport.clone());
//!     let entities = RelevantEntities::new().with_open_stock("005930");
//!     reconciler.reconcile(entities.desired_topics()).await;
//!
//!     transport.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod listeners;
pub mod messages;
pub mod reconciler;
pub mod reconnect;
pub mod state;
pub mod transport;

pub use config::WsConfig;
pub use connector::{Connector, CredentialProvider, Link, StaticCredential, TungsteniteConnector};
pub use error::WsError;
pub use listeners::{ListenerHandle, Listeners};
pub use messages::{ClientMessage, ErrorBody, MessageType, ServerMessage};
pub use reconciler::{
    diff, ReconcileOutcome, RelevantEntities, SubscriptionReconciler, SubscriptionSink, TopicDiff,
};
pub use reconnect::Backoff;
pub use state::{ConnectionState, StateChange};
pub use transport::Transport;
