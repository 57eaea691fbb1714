//! Structured logging for Archytas.
//!
//! Every Archytas crate logs through `tracing` macros. This crate installs
//! the subscriber that turns those events into output:
//!
//! - JSON lines for production, a pretty multi-line format for development
//! - `EnvFilter` directives (`"info"`, `"archytas_docs=debug,info"`)
//! - one span per served request carrying the request id, method and path
//!
//! # Example
//!
//! ```rust,ignore
//! use archytas_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(routes = 4, "mux prepared");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, request_span, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
