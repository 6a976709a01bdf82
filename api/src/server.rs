//! HTTP server.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// The fan-out server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a server.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Creates a server whose state accepts the tokens in `config`.
    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        let state = AppState::from_config(config.clone());
        Self::new(config, state)
    }

    /// Returns the shared state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Builds the router.
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Binds the configured address and serves until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
