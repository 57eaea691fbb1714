//! Path templates and path parameters for Archytas.
//!
//! A route path such as `/api/todo/{id}` is parsed once into a [`PathTemplate`]:
//! an ordered list of literal and variable segments. Matching a concrete request
//! path against a template yields [`Params`], the name to value mapping that the
//! structured-request binder later applies to handler arguments.
//!
//! # Example
//!
//! ```rust
//! use archytas_router::PathTemplate;
//!
//! let template = PathTemplate::parse("/api/todo/{id}").unwrap();
//! assert_eq!(template.parameter_names().collect::<Vec<_>>(), vec!["id"]);
//!
//! let params = template.match_path("/api/todo/5").unwrap();
//! assert_eq!(params.get("id"), Some("5"));
//! assert!(template.match_path("/api/todo").is_none());
//! ```

#![doc(html_root_url = "https://docs.rs/archytas-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod params;
mod template;

pub use error::{RouterError, RouterResult};
pub use params::Params;
pub use template::{PathTemplate, Segment};
