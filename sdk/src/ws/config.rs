//! WebSocket configuration.
//!
//! Provides configuration options for the client transport.

use std::time::Duration;

use super::error::WsError;

/// Default WebSocket URL.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/ws";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default reconnect delay in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 1;

/// Maximum reconnect delay in seconds.
pub const MAX_RECONNECT_DELAY_SECS: u64 = 30;

/// Default number of retries after a failed connect attempt.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default outbound frame queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// WebSocket configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL.
    pub url: String,

    /// Heartbeat interval.
    pub heartbeat_interval: Duration,

    /// Upper bound for a single connect attempt.
    pub connect_timeout: Duration,

    /// Initial reconnect delay.
    pub reconnect_delay: Duration,

    /// Maximum reconnect delay.
    pub max_reconnect_delay: Duration,

    /// Growth factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,

    /// Random spread applied to each delay, as a fraction of it.
    pub jitter_factor: f64,

    /// Retries after the first failed attempt before giving up.
    pub max_reconnect_attempts: u32,

    /// Reconnect in the background after an unexpected link failure.
    pub auto_reconnect: bool,

    /// Outbound frame queue capacity.
    pub queue_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            max_reconnect_delay: Duration::from_secs(MAX_RECONNECT_DELAY_SECS),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            auto_reconnect: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl WsConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the initial reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the maximum reconnect delay.
    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    /// Sets the jitter factor.
    #[must_use]
    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Enables or disables background reconnection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), WsError> {
        if self.url.is_empty() {
            return Err(WsError::InvalidConfig("url cannot be empty".to_string()));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(WsError::InvalidConfig(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(WsError::InvalidConfig(
                "connect_timeout must be > 0".to_string(),
            ));
        }

        if self.heartbeat_interval.is_zero() {
            return Err(WsError::InvalidConfig(
                "heartbeat_interval must be > 0".to_string(),
            ));
        }

        if self.backoff_multiplier < 1.0 {
            return Err(WsError::InvalidConfig(
                "backoff_multiplier must be >= 1.0".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.jitter_factor) {
            return Err(WsError::InvalidConfig(
                "jitter_factor must be in [0, 1)".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(WsError::InvalidConfig(
                "queue_capacity must be > 0".to_string(),
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
        let config = WsConfig::default();
        assert_eq!(config.url, DEFAULT_WS_URL);
        assert_eq!(
            config.heartbeat_interval,
            Duration::from_secs(DEFAULT_HEARTBEAT_SECS)
        );
        assert_eq!(config.max_reconnect_attempts, DEFAULT_MAX_RECONNECT_ATTEMPTS);
        assert!(config.auto_reconnect);
    }

    #[test]
    fn test_config_builder() {
        let config = WsConfig::new("wss://example.com/ws")
            .with_heartbeat_interval(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(3))
            .with_reconnect_delay(Duration::from_millis(200))
            .with_max_reconnect_delay(Duration::from_secs(5))
            .with_jitter_factor(0.0)
            .with_max_reconnect_attempts(2)
            .with_auto_reconnect(false);

        assert_eq!(config.url, "wss://example.com/ws");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.reconnect_delay, Duration::from_millis(200));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 2);
        assert!(!config.auto_reconnect);
    }

    #[test]
    fn test_config_validate_valid() {
        assert!(WsConfig::new("wss://example.com/ws").validate().is_ok());
    }

    #[test]
    fn test_config_validate_empty_url() {
        assert!(WsConfig::new("").validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_scheme() {
        assert!(WsConfig::new("https://example.com/ws").validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_backoff() {
        let config = WsConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_jitter() {
        let config = WsConfig::default().with_jitter_factor(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_zero_queue() {
        let config = WsConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
