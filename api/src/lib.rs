//! # Marketstream API
//!
//! WebSocket fan-out server: authenticated clients subscribe to topics and
//! upstream events posted to `/events` are delivered to every subscriber.
//!
//! ## Modules
//!
//! - [`ws`]: connection registry, dispatcher and socket handler
//! - [`auth`]: bearer token validation
//! - [`routes`]: HTTP routes
//! - [`server`]: listener and graceful shutdown

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use auth::{Principal, StaticTokenValidator, TokenValidator};
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::{create_router, IngestRequest};
pub use server::Server;
pub use state::AppState;
pub use ws::{ConnectionRegistry, DispatchReport, Dispatcher, DomainEvent, WsMetrics};
