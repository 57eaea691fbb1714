//! Errors raised while assembling a mux.

use archytas_config::ConfigError;
use archytas_router::RouterError;
use thiserror::Error;

/// Result type for mux assembly.
pub type MuxResult<T> = Result<T, MuxError>;

/// Failures of route registration and of [`ServeMux::prepare`](crate::ServeMux::prepare).
#[derive(Debug, Error)]
pub enum MuxError {
    /// The method is neither `*` nor a valid HTTP method token.
    #[error("invalid method: {0:?}")]
    InvalidMethod(String),

    /// The path template did not parse.
    #[error(transparent)]
    Template(#[from] RouterError),

    /// A scanner plugin rejected the registered routes.
    #[error("plugin {name} failed: {message}")]
    Plugin {
        /// Plugin name.
        name: String,
        /// The plugin's error, with its causes.
        message: String,
    },

    /// The configuration did not validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
