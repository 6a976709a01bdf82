//! Bearer credential validation.
//!
//! Token issuance lives outside this service. The server only checks a
//! presented token against a [`TokenValidator`] before upgrading a socket.

use std::collections::HashMap;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

/// Identity attached to an authenticated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject the token was issued to.
    pub subject: String,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Checks bearer tokens.
pub trait TokenValidator: Send + Sync {
    /// Returns the principal for a valid token.
    fn validate(&self, token: &str) -> Option<Principal>;
}

/// Validator over a fixed set of tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenValidator {
    /// Creates an empty validator that rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a validator from `name=token` entries.
    ///
    /// A bare token gets a generated subject. Blank entries are skipped.
    #[must_use]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut validator = Self::new();
        for (n, entry) in entries.into_iter().enumerate() {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            match entry.split_once('=') {
                Some((subject, token)) if !token.trim().is_empty() => {
                    validator = validator.with_token(token.trim(), subject.trim());
                }
                Some(_) => {}
                None => {
                    validator = validator.with_token(entry, format!("client-{}", n + 1));
                }
            }
        }
        validator
    }

    /// Accepts `token` for `subject`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), Principal::new(subject));
        self
    }

    /// Returns the number of accepted tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no token is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).cloned()
    }
}

/// Extracts the token from an `Authorization: Bearer` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
