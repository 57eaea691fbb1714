//! Typed configuration for Archytas.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides, optionally fed by a `.env` file
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! [`ArchytasConfig`] has three sections:
//!
//! - [`MuxConfig`] - request body strictness and debug rendering
//! - [`DocsConfig`] - the swagger document and its endpoint
//! - [`LoggingConfig`] - log filter and format
//!
//! # Example
//!
//! ```no_run
//! use archytas_config::ConfigLoader;
//!
//! # fn main() -> Result<(), archytas_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("archytas.toml")?
//!     .with_env_prefix("ARCHYTAS")
//!     .load()?;
//!
//! println!("docs served at {}", config.docs.endpoint);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [mux]
//! strict_json_bodies = false
//! debug = false
//!
//! [docs]
//! enabled = true
//! endpoint = "/api/swagger.json"
//! title = "Todo API"
//! version = "1.0.0"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every value can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `ARCHYTAS__MUX__STRICT_JSON_BODIES=true`
//! - `ARCHYTAS__DOCS__TITLE=Todo API`
//! - `ARCHYTAS__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{ArchytasConfig, ArchytasConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DocsConfig, LogFormat, LoggingConfig, MuxConfig};
