//! Configuration sections.

use archytas_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Request handling settings of the mux.
///
/// # Example
///
/// ```
/// use archytas_config::MuxConfig;
///
/// let config = MuxConfig {
///     strict_json_bodies: true,
///     debug: false,
/// };
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MuxConfig {
    /// Parse two-byte bodies such as `{}` instead of passing them through.
    #[serde(default)]
    pub strict_json_bodies: bool,

    /// Pretty-print JSON responses.
    #[serde(default)]
    pub debug: bool,
}

/// Swagger document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// Build and serve the document.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path the document is served at.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// `info.title` of the document.
    #[serde(default = "default_title")]
    pub title: String,

    /// `info.version` of the document.
    #[serde(default = "default_version")]
    pub version: String,

    /// `info.description` of the document.
    #[serde(default)]
    pub description: Option<String>,

    /// `basePath` of the document.
    #[serde(default)]
    pub base_path: Option<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            title: default_title(),
            version: default_version(),
            description: None,
            base_path: None,
        }
    }
}

fn default_endpoint() -> String {
    "/api/swagger.json".to_string()
}

fn default_title() -> String {
    "Archytas API".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Settings for `archytas_telemetry::init_logging`.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.format == LogFormat::Pretty,
            file_line_info: self.include_location,
            include_target: true,
            ansi: self.ansi_enabled,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_config_default() {
        let config = MuxConfig::default();
        assert!(!config.strict_json_bodies);
        assert!(!config.debug);
    }

    #[test]
    fn test_docs_config_default() {
        let config = DocsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.endpoint, "/api/swagger.json");
        assert_eq!(config.version, "1.0.0");
    }

    #[test]
    fn test_docs_config_partial_deserialize() {
        let config: DocsConfig = serde_json::from_str(r#"{"title": "Todo API"}"#).unwrap();
        assert_eq!(config.title, "Todo API");
        assert_eq!(config.endpoint, "/api/swagger.json");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<MuxConfig, _> = serde_json::from_str(r#"{"strict": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }

    #[test]
    fn test_to_log_config() {
        let config = LoggingConfig {
            format: LogFormat::Pretty,
            include_location: true,
            ..LoggingConfig::default()
        };
        let log = config.to_log_config();
        assert!(!log.json_format);
        assert!(log.span_events);
        assert!(log.file_line_info);
        assert_eq!(log.level, "info");

        assert!(LoggingConfig::default().to_log_config().json_format);
    }
}
