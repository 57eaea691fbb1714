//! # Archytas
//!
//! **A minimal HTTP API framework core**
//!
//! Archytas runs every request through an ordered chain of middleware around
//! a single typed handler:
//!
//! - 🫧 **Bubbles** – one execution context per request, with one argument slot per handler parameter
//! - 🧩 **Binders** – request, response writer, context and structured request objects bound by type
//! - 🗺️ **Response mapping** – returned payloads and errors rendered as JSON
//! - 📜 **Swagger 2.0** – operations and definitions generated from handler signatures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use archytas::prelude::*;
//!
//! #[derive(Deserialize, Reflect)]
//! struct GetTodo {
//!     #[api(in = "path")]
//!     id: i64,
//! }
//!
//! fn get_todo(req: Box<GetTodo>) -> Result<Todo, HttpError> {
//!     // Your handler logic here
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_defaults().with_env_prefix("ARCHYTAS").load()?;
//!     init_logging(&config.logging.to_log_config())?;
//!
//!     let mut mux = ServeMux::from_config(&config)?;
//!     mux.handle("GET", "/api/todo/{id}", get_todo)?;
//!     let service = mux.prepare()?;
//!
//!     let response = service.serve(request).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The orthodox chain binds in a fixed order before the handler runs:
//!
//! ```text
//! Request → HttpRwBinder → ContextBinder → ResponseMapper → RequestObjectMapper → Handler
//!                                              ↑                                     ↓
//!                                              └───────── returns / errors ──────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/archytas/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod mux;
mod service;

pub use error::{MuxError, MuxResult};
pub use mux::ServeMux;
pub use service::MuxService;

// Re-export core types
pub use archytas_core as core;

// Re-export router types
pub use archytas_router as router;

// Re-export middleware types
pub use archytas_middleware as middleware;

// Re-export document generation
pub use archytas_docs as docs;

// Re-export configuration
pub use archytas_config as config;

// Re-export logging setup
pub use archytas_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use archytas::prelude::*;
///
/// let mut mux = ServeMux::new();
/// mux.orthodox();
/// ```
pub mod prelude {
    pub use crate::{MuxError, MuxService, ServeMux};

    pub use archytas_core::{
        ChainError, Context, ErrorClass, HandlerError, HttpError, HttpErrorResponse, Reflect,
        Request, Response, ResponseModifier, ResponseWriter,
    };

    pub use archytas_middleware::{
        Bubble, FnMiddleware, Middleware, RequestObjectMapper, RequestValidator, SchemaValidator,
    };

    pub use archytas_router::Params;

    pub use archytas_docs::{HandlerInfo, Object, SwaggerPlugin, Tag};

    pub use archytas_config::{ArchytasConfig, ConfigLoader};

    pub use archytas_telemetry::{init_logging, LogConfig};
}
