//! # Archytas Docs
//!
//! Swagger 2.0 documents generated from handler signatures.
//!
//! The same signatures the middleware chain binds at request time are walked
//! once at startup:
//!
//! - the **schema registry** turns request, response and error types into
//!   schemas, promoting named structs to `#/definitions`;
//! - the **operation assembler** turns each route into an operation with
//!   path, query and body parameters;
//! - the **swagger plugin** runs both over every route and serves the result
//!   at `/api/swagger.json`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use archytas::ServeMux;
//! use archytas_docs::{HandlerInfo, Object, SwaggerPlugin, Tag};
//!
//! let mut swagger = SwaggerPlugin::new(Object::new("Todo API", "1.0.0"));
//! swagger.add_tag(Tag::new("todo").with_description("todo operations"));
//!
//! let mut mux = ServeMux::new();
//! mux.orthodox();
//! mux.plugin(swagger);
//! mux.handle_container("GET", "/api/todo/{id}", HandlerInfo::new(get_todo).tag("todo"))?;
//! let service = mux.prepare()?;
//! ```
//!
//! ## Features
//!
//! - **Cycle-safe**: self- and mutually-recursive types become references
//! - **Deterministic**: parameters are sorted, definitions keep discovery order
//! - **Fail-fast**: unsupported types abort the scan instead of producing a partial document

#![doc(html_root_url = "https://docs.rs/archytas-docs/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assembler;
mod error;
mod openapi;
mod plugin;
mod registry;

pub use assembler::{OperationAssembler, OPERATION_KEY};
pub use error::{DocsError, DocsResult};
pub use openapi::{
    Contact, ExternalDocs, Info, Items, License, Object, Operation, Parameter, ParameterIn,
    PathItem, Response, Schema, SchemaType, Tag, SWAGGER_VERSION,
};
pub use plugin::{HandlerInfo, SwaggerOptions, SwaggerPlugin, DEFAULT_ENDPOINT};
pub use registry::{DefinitionNameModifier, SchemaId, SchemaRegistry, TypeSchema};
