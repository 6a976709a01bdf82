//! WebSocket connection handler.
//!
//! Provides the upgrade handler and the per-connection loop. Authentication
//! happens before the upgrade; once upgraded, a connection lives until the
//! peer closes it or the dispatcher tears it down.

use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use marketstream_sdk::ws::{ClientMessage, ServerMessage};
use marketstream_sdk::Topic;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::connection::Connection;
use crate::auth::{bearer_token, Principal};
use crate::error::ApiError;
use crate::state::AppState;

/// How long the writer may keep draining after the reader stops.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Bearer token, for clients that cannot set headers.
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// Rejects the request with 401 unless it carries a valid bearer token in the
/// `Authorization` header or the `token` query parameter.
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(principal) = authenticate(&state, &headers, params.token) else {
        state.metrics.record_auth_failure();
        warn!("Rejected WebSocket upgrade: missing or invalid credential");
        return ApiError::Unauthorized.into_response();
    };

    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_connection(socket, state, principal))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap, query: Option<String>) -> Option<Principal> {
    let token = bearer_token(headers).or(query)?;
    state.auth.validate(&token)
}

/// Handles a WebSocket connection.
async fn handle_connection(socket: WebSocket, state: AppState, principal: Principal) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.queue_capacity);
    let connection = Connection::new(tx).with_principal(principal.subject);
    let connection_id = connection.id();

    state.registry.register(connection.clone()).await;
    state.metrics.record_connection_opened();
    info!(
        "WebSocket connection {} opened for {}",
        connection_id,
        connection.principal().unwrap_or("anonymous")
    );

    let metrics = std::sync::Arc::clone(&state.metrics);
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };

            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics.record_message_sent();
        }
        let _ = ws_sender.close().await;
    });

    if connection
        .try_send(ServerMessage::connected(connection_id))
        .is_err()
    {
        warn!("Connection {} closed before handshake", connection_id);
    }

    loop {
        tokio::select! {
            () = connection.closed() => {
                info!("Connection {} closed by dispatcher", connection_id);
                break;
            }
            frame = ws_receiver.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", connection_id, e);
                        state.metrics.record_error();
                        break;
                    }
                    None => break,
                };

                state.metrics.record_message_received();

                match msg {
                    Message::Text(text) => {
                        let replies = handle_text_message(&text, connection_id, &state).await;
                        if !deliver(&connection, replies).await {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        debug!("Connection {} requested close", connection_id);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    let released = state.registry.disconnect(connection_id).await;
    drop(connection);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }
    state.metrics.record_connection_closed();

    info!(
        "WebSocket connection {} closed ({} subscriptions released)",
        connection_id,
        released.map_or(0, |topics| topics.len())
    );
}

/// Queues replies, waiting for the writer to make room.
///
/// Returns false once the queue is gone or the connection was torn down
/// while waiting.
async fn deliver(connection: &Connection, replies: Vec<ServerMessage>) -> bool {
    for reply in replies {
        tokio::select! {
            sent = connection.send(reply) => {
                if let Err(e) = sent {
                    warn!("Reply to connection {} failed: {}", connection.id(), e);
                    return false;
                }
            }
            () = connection.closed() => {
                info!("Connection {} closed by dispatcher", connection.id());
                return false;
            }
        }
    }
    true
}

/// Parses and handles one text frame.
///
/// Malformed frames produce an error envelope and never close the connection.
async fn handle_text_message(
    text: &str,
    connection_id: u64,
    state: &AppState,
) -> Vec<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_client_message(msg, connection_id, state).await,
        Err(e) => {
            debug!("Malformed frame from {}: {}", connection_id, e);
            state.metrics.record_error();
            vec![ServerMessage::error(format!("invalid message: {}", e))]
        }
    }
}

/// Applies a client frame to the registry and returns the replies.
async fn handle_client_message(
    msg: ClientMessage,
    connection_id: u64,
    state: &AppState,
) -> Vec<ServerMessage> {
    match msg {
        ClientMessage::Subscribe {
            topic_type,
            topic_key,
        } => vec![subscribe_one(Topic::new(topic_type, topic_key), connection_id, state).await],
        ClientMessage::Unsubscribe {
            topic_type,
            topic_key,
        } => vec![unsubscribe_one(Topic::new(topic_type, topic_key), connection_id, state).await],
        ClientMessage::SubscribeBatch { topics } => {
            subscribe_batch(topics, connection_id, state).await
        }
        ClientMessage::Ping => vec![ServerMessage::pong()],
    }
}

async fn subscribe_one(topic: Topic, connection_id: u64, state: &AppState) -> ServerMessage {
    if let Err(e) = topic.validate() {
        return ServerMessage::topic_error(topic, e.to_string());
    }

    match state.registry.subscribe(connection_id, topic.clone()).await {
        Ok(added) => {
            if added {
                state.metrics.record_subscription();
                debug!("Connection {} subscribed to {}", connection_id, topic);
            }
            ServerMessage::subscribed(topic)
        }
        Err(e) => ServerMessage::topic_error(topic, e.to_string()),
    }
}

async fn unsubscribe_one(topic: Topic, connection_id: u64, state: &AppState) -> ServerMessage {
    if state.registry.unsubscribe(connection_id, &topic).await {
        state.metrics.record_unsubscription();
        debug!("Connection {} unsubscribed from {}", connection_id, topic);
    }
    ServerMessage::unsubscribed(topic)
}

async fn subscribe_batch(
    topics: Vec<Topic>,
    connection_id: u64,
    state: &AppState,
) -> Vec<ServerMessage> {
    let (valid, invalid): (Vec<Topic>, Vec<Topic>) =
        topics.into_iter().partition(|t| t.validate().is_ok());

    let mut replies: Vec<ServerMessage> = invalid
        .into_iter()
        .map(|topic| {
            let message = format!("invalid topic: {}", topic);
            ServerMessage::topic_error(topic, message)
        })
        .collect();

    match state
        .registry
        .subscribe_many(connection_id, valid.iter().cloned())
        .await
    {
        Ok(added) => {
            for _ in 0..added {
                state.metrics.record_subscription();
            }
            debug!(
                "Connection {} batch subscribed to {} topics ({} new)",
                connection_id,
                valid.len(),
                added
            );
            replies.extend(valid.into_iter().map(ServerMessage::subscribed));
        }
        Err(e) => {
            let message = e.to_string();
            replies.extend(
                valid
                    .into_iter()
                    .map(|topic| ServerMessage::topic_error(topic, message.clone())),
            );
        }
    }

    replies
}
