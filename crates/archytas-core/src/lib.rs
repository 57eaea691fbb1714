//! # Archytas Core
//!
//! Core types and traits for the Archytas API framework.
//!
//! - [`Reflect`], [`TypeInfo`], [`Kind`], [`FieldInfo`] - static type descriptors
//! - [`Handler`], [`Param`], [`Signature`] - handler signatures and type-erased calls
//! - [`ReturnValue`], [`IntoReturns`] - captured handler returns
//! - [`Exchange`], [`ResponseWriter`], [`Context`] - the ambient objects of one call
//! - [`HandlerError`], [`HttpErrorResponse`], [`ChainError`], [`HttpError`] - error capabilities
//! - [`RouteDefinition`], [`HandlerContainer`], [`HandlersScannerPlugin`] - routes and plugins
//! - [`as_string`] - serde codec for `#[api(as_string)]` fields

#![doc(html_root_url = "https://docs.rs/archytas-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate self as archytas_core;

pub mod as_string;
mod context;
mod error;
mod exchange;
mod handler;
mod plugin;
mod reflect;
mod returns;
mod route;
mod types;
mod writer;

pub use archytas_macros::Reflect;
pub use context::{CancelHandle, Context, ContextKey, RequestId, PATH_PARAMETERS_KEY};
pub use error::{
    AsAny, ChainError, ChainResult, DispatchError, ErrorClass, HandlerError, HttpError,
    HttpErrorResponse,
};
pub use exchange::{Exchange, ResponseModifier};
pub use handler::{
    into_handler, AggregateCodec, ArgDescriptor, ArgKind, BoundValue, BoxedHandler,
    ErasedHandler, Handler, HandlerFn, Param, RequestObject, Signature,
};
pub use plugin::{HandlersScannerPlugin, RouteRegistrar};
pub use reflect::{
    opaque_type_info, ApiAttrs, FieldInfo, IntWidth, Kind, ParamLocation, Reflect, TypeInfo,
    TypeInfoFn,
};
pub use returns::{
    IntoReturns, Payload, ReturnDescriptor, ReturnError, ReturnPart, ReturnPayload, ReturnRole,
    ReturnValue,
};
pub use route::{BasicContainer, HandlerContainer, RouteDefinition, ANY_METHOD};
pub use types::{BoxFuture, Request, Response};
pub use writer::{ResponseWriter, JSON_CONTENT_TYPE};
