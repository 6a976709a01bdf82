//! Shared application state.

use std::sync::Arc;

use crate::auth::{StaticTokenValidator, TokenValidator};
use crate::config::ServerConfig;
use crate::ws::{ConnectionRegistry, Dispatcher, WsMetrics};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Connection and subscription index.
    pub registry: Arc<ConnectionRegistry>,
    /// Topic fan-out.
    pub dispatcher: Dispatcher,
    /// WebSocket counters.
    pub metrics: Arc<WsMetrics>,
    /// Bearer token check.
    pub auth: Arc<dyn TokenValidator>,
}

impl AppState {
    /// Creates state with the given token validator.
    #[must_use]
    pub fn new(config: ServerConfig, auth: Arc<dyn TokenValidator>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(WsMetrics::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&metrics));
        Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            metrics,
            auth,
        }
    }

    /// Creates state that accepts the tokens listed in `config`.
    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        let auth = StaticTokenValidator::from_entries(&config.tokens);
        Self::new(config, Arc::new(auth))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
