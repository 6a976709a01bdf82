//! Watchlist client configuration.

use std::time::Duration;

use super::error::ClientError;

/// Default base URL of the watchlist service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8081";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum number of retries for failed requests.
    pub max_retries: u32,

    /// Bearer token sent with every request.
    pub bearer_token: Option<String>,

    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            bearer_token: None,
            user_agent: format!("marketstream-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.is_empty() {
            return Err(ClientError::InvalidConfig(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::InvalidConfig(
                "base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.bearer_token.as_deref().is_some_and(str::is_empty) {
            return Err(ClientError::InvalidConfig(
                "bearer_token cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_config_new() {
        let config = ClientConfig::new("http://watchlists.internal");
        assert_eq!(config.base_url, "http://watchlists.internal");
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://watchlists.internal")
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(1)
            .with_bearer_token("token")
            .with_user_agent("terminal/2.1");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.bearer_token.as_deref(), Some("token"));
        assert_eq!(config.user_agent, "terminal/2.1");
    }

    #[test]
    fn test_config_validate_valid() {
        let config = ClientConfig::new("http://watchlists.internal");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_empty_url() {
        let config = ClientConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_scheme() {
        let config = ClientConfig::new("ws://watchlists.internal");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_empty_token() {
        let config = ClientConfig::new("http://watchlists.internal").with_bearer_token("");
        assert!(config.validate().is_err());
    }
}
