//! Error types for feed operations.

use thiserror::Error;

/// Errors that can occur during feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("WebSocket disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Feed task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::ConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::ConnectionFailed(err.to_string())
    }
}

impl From<std::str::Utf8Error> for FeedError {
    fn from(err: std::str::Utf8Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FeedError::MissingCredential("FINNHUB_API_KEY").to_string(),
            "Missing credential: FINNHUB_API_KEY"
        );
        assert_eq!(
            FeedError::TaskFailed("panicked".into()).to_string(),
            "Feed task failed: panicked"
        );
    }

    #[test]
    fn test_json_error_converts_to_parse_error() {
        let err: FeedError = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, FeedError::ParseError(_)));
    }
}
