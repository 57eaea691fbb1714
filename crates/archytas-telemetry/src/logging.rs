//! Subscriber setup and request spans.

use tracing::Span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "archytas_middleware=debug,info").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to emit span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Whether to color the pretty format.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            include_target: true,
            ansi: false,
        }
    }
}

impl LogConfig {
    /// Human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ansi: true,
            ..Self::default()
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Installs the global subscriber.
///
/// Does nothing when logging is disabled. Fails if the filter is invalid or
/// a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    Ok(())
}

/// Parses a filter directive.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Span wrapping one served request.
///
/// `status` is recorded once the response is known.
pub fn request_span(request_id: &dyn std::fmt::Display, method: &str, path: &str) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id,
        http.method = %method,
        http.path = %path,
        http.status_code = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
        assert_eq!(config, LogConfig::production());
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("archytas_docs=debug,warn").is_ok());
        let err = create_env_filter("archytas=loud").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_disabled_logging_is_a_no_op() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_invalid_level_is_rejected_before_install() {
        let config = LogConfig {
            level: "archytas=loud".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_request_span_records_status() {
        let span = request_span(&"req-1", "GET", "/api/todo");
        span.record("http.status_code", 200_u16);
        let _entered = span.enter();
        tracing::debug!("inside request span");
    }
}
