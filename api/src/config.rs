//! Server configuration.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-connection outbound queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {name}: {value}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Outbound queue capacity per connection.
    pub queue_capacity: usize,
    /// Accepted bearer tokens, as `name=token` or bare tokens.
    pub tokens: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration bound to `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Sets the outbound queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Adds an accepted token entry.
    #[must_use]
    pub fn with_token(mut self, entry: impl Into<String>) -> Self {
        self.tokens.push(entry.into());
        self
    }

    /// Reads `API_HOST`, `API_PORT`, `WS_QUEUE_CAPACITY` and `API_TOKENS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("API_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "API_PORT",
                value: port,
            })?;
        }
        if let Some(capacity) = lookup("WS_QUEUE_CAPACITY") {
            config.queue_capacity =
                capacity
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidVar {
                        name: "WS_QUEUE_CAPACITY",
                        value: capacity,
                    })?;
        }
        if let Some(tokens) = lookup("API_TOKENS") {
            config.tokens = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host cannot be empty".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the bind address string.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.addr()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad bind address {}", self.addr())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_from_lookup() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("WS_QUEUE_CAPACITY", "16"),
            ("API_TOKENS", "desk=abc, xyz ,,"),
        ]))
        .expect("config");

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.tokens, vec!["desk=abc", "xyz"]);
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let result = ServerConfig::from_lookup(lookup(&[("API_PORT", "eighty")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidVar {
                name: "API_PORT",
                value: "eighty".to_string()
            })
        );
    }

    #[test]
    fn test_zero_queue_rejected() {
        let result = ServerConfig::from_lookup(lookup(&[("WS_QUEUE_CAPACITY", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::new("127.0.0.1", 0)
            .with_queue_capacity(4)
            .with_token("t");
        assert!(config.validate().is_ok());
        assert_eq!(config.tokens.len(), 1);
    }
}
