//! Test error types.

use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// Response body reading failed.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Header name or value is invalid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TestError::InvalidHeader("bad\nvalue".to_string());
        assert_eq!(err.to_string(), "Invalid header: bad\nvalue");

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TestError::from(json);
        assert!(err.to_string().starts_with("JSON error: "));
    }
}
