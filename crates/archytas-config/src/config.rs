//! The root configuration type and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DocsConfig, LogFormat, LoggingConfig, MuxConfig};

/// Complete Archytas service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use archytas_config::ArchytasConfig;
///
/// let config = ArchytasConfig::default();
/// assert_eq!(config.docs.endpoint, "/api/swagger.json");
/// assert!(!config.mux.strict_json_bodies);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ArchytasConfig {
    /// Request handling.
    #[serde(default)]
    pub mux: MuxConfig,

    /// Swagger document.
    #[serde(default)]
    pub docs: DocsConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ArchytasConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ArchytasConfigBuilder {
        ArchytasConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the docs endpoint does not start with `/`
    /// - the docs title or version is empty while docs are enabled
    /// - the log filter cannot be parsed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.docs.enabled {
            if !self.docs.endpoint.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "docs.endpoint",
                    format!("must start with '/': {}", self.docs.endpoint),
                ));
            }
            if self.docs.title.trim().is_empty() {
                return Err(ConfigError::invalid_value("docs.title", "must not be empty"));
            }
            if self.docs.version.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "docs.version",
                    "must not be empty",
                ));
            }
        }

        if self.logging.enabled {
            archytas_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with source locations,
    /// pretty-printed responses.
    ///
    /// ```
    /// use archytas_config::ArchytasConfig;
    ///
    /// let config = ArchytasConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.mux.debug);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.mux.debug = true;

        config
    }

    /// Production preset: JSON logs at info level, strict request bodies.
    ///
    /// ```
    /// use archytas_config::{ArchytasConfig, LogFormat};
    ///
    /// let config = ArchytasConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(config.mux.strict_json_bodies);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.mux.debug = false;
        config.mux.strict_json_bodies = true;

        config
    }
}

/// Builder for [`ArchytasConfig`].
#[derive(Debug, Default)]
pub struct ArchytasConfigBuilder {
    mux: Option<MuxConfig>,
    docs: Option<DocsConfig>,
    logging: Option<LoggingConfig>,
}

impl ArchytasConfigBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mux section.
    #[must_use]
    pub fn mux(mut self, mux: MuxConfig) -> Self {
        self.mux = Some(mux);
        self
    }

    /// Set the docs section.
    #[must_use]
    pub fn docs(mut self, docs: DocsConfig) -> Self {
        self.docs = Some(docs);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration, defaulting unset sections.
    #[must_use]
    pub fn build(self) -> ArchytasConfig {
        ArchytasConfig {
            mux: self.mux.unwrap_or_default(),
            docs: self.docs.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}
