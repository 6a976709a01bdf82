//! HTTP client for the watchlist service.
//!
//! Watchlists are the persisted entities that decide which stock topics a
//! terminal keeps subscribed.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize};

use super::config::ClientConfig;
use super::error::ClientError;
use crate::types::Watchlist;
use crate::ws::RelevantEntities;

/// API error response format.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// API error details.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    message: String,
}

/// Watchlists list response.
#[derive(Debug, Deserialize)]
struct WatchlistsResponse {
    watchlists: Vec<Watchlist>,
}

/// Single watchlist response.
#[derive(Debug, Deserialize)]
struct WatchlistResponse {
    watchlist: Watchlist,
}

/// HTTP client for the watchlist service.
#[derive(Debug, Clone)]
pub struct WatchlistClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl WatchlistClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref token) = config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidConfig(format!("invalid bearer token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self { config, http })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, ClientError> {
        Self::new(ClientConfig::default())
    }

    /// Creates a new client with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(base_url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Makes a GET request to the given path.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.config.base_url, path);
        self.request_with_retry(|| self.http.get(&url)).await
    }

    /// Makes a request with retry logic.
    async fn request_with_retry<T, F>(&self, request_fn: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;
        let mut retry_count = 0;

        while retry_count <= self.config.max_retries {
            let response = request_fn().send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let body = resp
                            .text()
                            .await
                            .map_err(|e| ClientError::Deserialization(e.to_string()))?;

                        return serde_json::from_str(&body)
                            .map_err(|e| ClientError::Deserialization(e.to_string()));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse().ok());

                        if retry_count < self.config.max_retries {
                            let wait_time = retry_after.unwrap_or(1);
                            tokio::time::sleep(Duration::from_secs(wait_time)).await;
                            retry_count += 1;
                            continue;
                        }

                        return Err(ClientError::RateLimited { retry_after });
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(ClientError::NotFound("resource".to_string()));
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ClientError::Unauthorized);
                    }

                    let body = resp.text().await.unwrap_or_default();
                    if let Ok(error_resp) = serde_json::from_str::<ApiErrorResponse>(&body) {
                        return Err(ClientError::Api {
                            code: error_resp.error.code,
                            message: error_resp.error.message,
                        });
                    }

                    return Err(ClientError::Api {
                        code: status.as_str().to_string(),
                        message: body,
                    });
                }
                Err(e) => {
                    if e.is_timeout() && retry_count < self.config.max_retries {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_millis(100 * (1 << retry_count))).await;
                        last_error = Some(ClientError::from(e));
                        continue;
                    }
                    return Err(ClientError::from(e));
                }
            }
        }

        Err(last_error.unwrap_or(ClientError::Timeout))
    }

    /// Lists the caller's watchlists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_watchlists(&self) -> Result<Vec<Watchlist>, ClientError> {
        let response: WatchlistsResponse = self.get("/watchlists").await?;
        Ok(response.watchlists)
    }

    /// Gets one watchlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the watchlist does not exist.
    pub async fn get_watchlist(&self, id: &str) -> Result<Watchlist, ClientError> {
        let response: WatchlistResponse = self
            .get(&format!("/watchlists/{}", id))
            .await
            .map_err(|e| match e {
                ClientError::NotFound(_) => ClientError::NotFound(format!("watchlist {}", id)),
                other => other,
            })?;
        Ok(response.watchlist)
    }

    /// Builds the entities implied by every stored watchlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn relevant_entities(&self) -> Result<RelevantEntities, ClientError> {
        let watchlists = self.list_watchlists().await?;
        Ok(entities_from(&watchlists))
    }
}

/// Collects the stock codes and ids of `watchlists`.
#[must_use]
pub fn entities_from(watchlists: &[Watchlist]) -> RelevantEntities {
    watchlists
        .iter()
        .fold(RelevantEntities::new(), |entities, list| {
            entities
                .with_watchlist(list.id.clone())
                .with_watchlist_codes(list.stock_codes.iter().cloned())
        })
}
