//! HTTP routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use marketstream_sdk::ws::ServerMessage;
use marketstream_sdk::Topic;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use crate::ws::{ws_handler, DispatchReport, DomainEvent, WsMetricsSnapshot};

/// Body accepted by `POST /events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngestRequest {
    /// A ready-made envelope for a topic.
    Raw {
        /// Target topic.
        topic: Topic,
        /// Envelope to deliver.
        message: ServerMessage,
    },
    /// A domain event mapped to its topic and envelope.
    Event(DomainEvent),
}

impl IngestRequest {
    /// Resolves the target topic and envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic or event is invalid.
    pub fn into_envelope(self) -> Result<(Topic, ServerMessage), ApiError> {
        match self {
            Self::Raw { topic, mut message } => {
                topic.validate()?;
                if message.topic.is_none() {
                    message.topic = Some(topic.clone());
                }
                Ok((topic, message))
            }
            Self::Event(event) => event.into_envelope(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the server runs.
    pub status: &'static str,
    /// Live connections.
    pub connections: usize,
    /// Topics with at least one subscriber.
    pub topics: usize,
    /// Live subscriptions.
    pub subscriptions: usize,
    /// Counter snapshot.
    pub metrics: WsMetricsSnapshot,
}

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/events", post(ingest))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<DispatchReport>, ApiError> {
    let (topic, message) = request.into_envelope()?;
    debug!("Ingested {:?} for {}", message.kind, topic);
    Ok(Json(state.dispatcher.dispatch(&topic, message).await))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry.connection_count().await,
        topics: state.registry.topic_count().await,
        subscriptions: state.registry.total_subscriptions().await,
        metrics: state.metrics.snapshot(),
    })
}
