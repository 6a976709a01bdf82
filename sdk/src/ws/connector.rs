//! Network and credential ports used by the transport.
//!
//! The transport never touches a socket directly: it asks a [`Connector`]
//! for a [`Link`], a pair of frame queues bridged to the wire by the
//! connector's own tasks.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::error::WsError;

/// An open link to the server.
///
/// Dropping `outbound` closes the underlying socket once queued frames are
/// flushed. `inbound` ends when the server goes away.
#[derive(Debug)]
pub struct Link {
    /// Text frames to send.
    pub outbound: mpsc::Sender<String>,
    /// Text frames received, or the error that ended the link.
    pub inbound: mpsc::Receiver<Result<String, WsError>>,
}

/// Opens links to the server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a link authenticated with `token`.
    async fn open(&self, url: &str, token: &str) -> Result<Link, WsError>;
}

/// Supplies the bearer credential for new sessions.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current bearer token, if one is stored.
    fn bearer_token(&self) -> Option<String>;
}

/// A credential fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential {
    token: Option<String>,
}

impl StaticCredential {
    /// Creates a provider returning `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Creates a provider with no credential.
    #[must_use]
    pub const fn none() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredential {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    queue_capacity: usize,
}

impl TungsteniteConnector {
    /// Creates a connector whose link queues hold `queue_capacity` frames.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn open(&self, url: &str, token: &str) -> Result<Link, WsError> {
        let mut request = url.into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| WsError::InvalidConfig(format!("invalid token: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut sink, mut source) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<String>(self.queue_capacity);
        let (in_tx, in_rx) = mpsc::channel(self.queue_capacity);

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!("WebSocket write failed: {}", e);
                    return;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
            debug!("Outbound queue closed, socket closed");
        });

        tokio::spawn(async move {
            while let Some(result) = source.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(Ok(text.as_str().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = in_tx.send(Err(WsError::from(e))).await;
                        break;
                    }
                }
            }
        });

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
