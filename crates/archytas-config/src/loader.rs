//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ArchytasConfig, ConfigError, LogFormat};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values or a preset
/// 2. Configuration file (TOML or JSON)
/// 3. `.env` file, which only feeds the next layer
/// 4. Environment variables named `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use archytas_config::ConfigLoader;
///
/// # fn main() -> Result<(), archytas_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("archytas.toml")?
///     .with_dotenv()?
///     .with_env_prefix("ARCHYTAS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: ArchytasConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ArchytasConfig::default(),
            env_prefix: None,
        }
    }

    /// Start over from default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = ArchytasConfig::default();
        self
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = ArchytasConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = ArchytasConfig::production();
        self
    }

    /// Load a TOML (`.toml`) or JSON (`.json`) file.
    ///
    /// The file replaces the current configuration; sections and fields it
    /// leaves out take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.config = Self::parse_file(&content, path)?;

        Ok(self)
    }

    /// Load a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `"toml"` or `"json"` format.
    ///
    /// ```
    /// use archytas_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [docs]
    ///     title = "Todo API"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.docs.title, "Todo API");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// With prefix `ARCHYTAS`, `ARCHYTAS__MUX__STRICT_JSON_BODIES=true`
    /// overrides `mux.strict_json_bodies`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load `.env` from the current directory or its parents, if present.
    ///
    /// Variables already set in the process environment win.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load variables from a specific env file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    ///
    /// ```
    /// use archytas_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.docs.endpoint, "/api/swagger.json");
    /// ```
    pub fn load(mut self) -> Result<ArchytasConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Return the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ArchytasConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<ArchytasConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(
                extension.clone().unwrap_or_default(),
            )),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();
        let bool_value = || {
            parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
        };

        match parts.as_slice() {
            ["MUX", "STRICT_JSON_BODIES"] => self.config.mux.strict_json_bodies = bool_value()?,
            ["MUX", "DEBUG"] => self.config.mux.debug = bool_value()?,

            ["DOCS", "ENABLED"] => self.config.docs.enabled = bool_value()?,
            ["DOCS", "ENDPOINT"] => self.config.docs.endpoint = value.to_string(),
            ["DOCS", "TITLE"] => self.config.docs.title = value.to_string(),
            ["DOCS", "VERSION"] => self.config.docs.version = value.to_string(),
            ["DOCS", "DESCRIPTION"] => self.config.docs.description = non_empty(value),
            ["DOCS", "BASE_PATH"] => self.config.docs.base_path = non_empty(value),

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = bool_value()?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => self.config.logging.ansi_enabled = bool_value()?,
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = bool_value()?;
            }

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
