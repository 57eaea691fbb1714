//! Built-in middleware stages.
//!
//! ## Binders
//!
//! - [`binders`] - request, response writer and context slots
//! - [`request_object`] - the structured request object, from path, query and body
//!
//! ## Rendering
//!
//! - [`response_mapper`] - errors and payloads as JSON
//!
//! ## Optional
//!
//! - [`validation`] - request-object validation before the handler runs

pub mod binders;
pub mod request_object;
pub mod response_mapper;
pub mod validation;
