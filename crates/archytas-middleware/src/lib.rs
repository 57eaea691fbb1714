//! # Archytas Middleware
//!
//! The middleware chain of the Archytas framework.
//!
//! Every call travels through the chain inside a [`Bubble`]: the request,
//! the response writer, the context, one argument slot per handler
//! parameter and, once the handler ran, its captured return values.
//! Middleware receive the bubble, may fill slots or short-circuit, and
//! continue with [`Bubble::next`]. When the last middleware continues, the
//! handler is invoked with the bound slots.
//!
//! ## Orthodox Chain
//!
//! ```text
//! Request → HttpRwBinder → ContextBinder → ResponseMapper → RequestObjectMapper → Handler
//!                                               ↑                                    ↓
//!                                               └────────── returns / error ─────────┘
//! ```
//!
//! | Stage | Middleware            | Purpose                                        |
//! |-------|-----------------------|------------------------------------------------|
//! | 1     | `HttpRwBinder`        | Bind the request and the response writer       |
//! | 2     | `ContextBinder`       | Bind the call context                          |
//! | 3     | `ResponseMapper`      | Render errors and the first payload as JSON    |
//! | 4     | `RequestObjectMapper` | Decode path, query and body into the request object |
//!
//! The response mapper sits before the request-object binder so binding
//! failures are rendered like any handler error.
//!
//! ## Example
//!
//! ```
//! use archytas_middleware::Pipeline;
//!
//! let pipeline = Pipeline::builder().orthodox().build();
//! assert_eq!(
//!     pipeline.stage_names(),
//!     ["http_rw_binder", "context_binder", "response_mapper", "request_object_mapper"],
//! );
//! ```

#![doc(html_root_url = "https://docs.rs/archytas-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bubble;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use bubble::Bubble;
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stages::binders::{ContextBinder, HttpRwBinder};
pub use stages::request_object::{BindError, RequestObjectMapper};
pub use stages::response_mapper::ResponseMapper;
pub use stages::validation::{
    ArgumentView, RequestValidator, SchemaValidator, ValidationError, Validator,
};
