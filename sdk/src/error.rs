//! SDK error types.
//!
//! Provides error types for parsing and validating shared SDK values.

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Topic string could not be parsed.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// Unknown topic type.
    #[error("unknown topic type: {0}")]
    UnknownTopicType(String),

    /// Order book levels are not in the expected order.
    #[error("invalid order book: {0}")]
    InvalidBook(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdkError::InvalidTopic("stock:".to_string());
        assert_eq!(err.to_string(), "invalid topic: stock:");
    }

    #[test]
    fn test_error_unknown_topic_type() {
        let err = SdkError::UnknownTopicType("bond".to_string());
        assert_eq!(err.to_string(), "unknown topic type: bond");
    }
}
