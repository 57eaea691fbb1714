//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The filter directive could not be parsed.
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("already set".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: already set");

        let err = TelemetryError::InvalidFilter {
            filter: "archytas=loud".to_string(),
            reason: "invalid level".to_string(),
        };
        assert!(err.to_string().contains("archytas=loud"));
    }
}
