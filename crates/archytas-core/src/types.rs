//! Transport type aliases shared by every crate.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;

/// Inbound request with a fully buffered body.
pub type Request = http::Request<Full<Bytes>>;

/// Outbound response with a fully buffered body.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
