//! Response sink shared by middleware, handlers and response modifiers.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::Response;

/// Content type of every JSON body written by the framework.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Default)]
struct WriterState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

/// A buffered response under construction.
///
/// Clones share the same buffer, so the writer handed to a handler and the
/// one the transport turns into a [`Response`] see the same bytes. The first
/// status written wins; later calls to [`ResponseWriter::write_header`] are
/// ignored.
///
/// ```
/// use archytas_core::ResponseWriter;
/// use http::StatusCode;
///
/// let writer = ResponseWriter::new();
/// writer.write_header(StatusCode::CREATED);
/// writer.write(b"done");
/// writer.write_header(StatusCode::OK);
///
/// assert_eq!(writer.status(), Some(StatusCode::CREATED));
/// assert_eq!(writer.body_string(), "done");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<WriterState>>,
}

impl ResponseWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.state.lock().headers.insert(name, value);
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.state.lock().headers.get(name).cloned()
    }

    /// Returns a copy of all headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.state.lock().headers.clone()
    }

    /// Writes the status line. Returns false if a status was already written.
    pub fn write_header(&self, status: StatusCode) -> bool {
        let mut state = self.state.lock();
        if let Some(existing) = state.status {
            tracing::debug!(
                existing = existing.as_u16(),
                ignored = status.as_u16(),
                "superfluous write_header call"
            );
            return false;
        }
        state.status = Some(status);
        true
    }

    /// Appends to the body, implying `200 OK` if no status was written.
    pub fn write(&self, data: &[u8]) {
        let mut state = self.state.lock();
        if state.status.is_none() {
            state.status = Some(StatusCode::OK);
        }
        state.body.extend_from_slice(data);
    }

    /// Serializes `value` as the JSON response body.
    ///
    /// Pretty output uses two-space indentation.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
        pretty: bool,
    ) -> Result<(), serde_json::Error> {
        let body = if pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        self.write_json_bytes(status, &body);
        Ok(())
    }

    /// Writes an already encoded JSON body with its content type.
    pub fn write_json_bytes(&self, status: StatusCode, body: &[u8]) {
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        self.write_header(status);
        self.write(body);
    }

    /// Writes a plain-text error body.
    pub fn write_text(&self, status: StatusCode, text: &str) {
        self.set_header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.write_header(status);
        self.write(text.as_bytes());
    }

    /// Status written so far.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().status
    }

    /// Returns true once a status or body was written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.state.lock().status.is_some()
    }

    /// Body written so far.
    #[must_use]
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state.lock().body)
    }

    /// Body written so far, decoded lossily as UTF-8.
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().body).into_owned()
    }

    /// Builds the final response. An untouched writer yields an empty `200 OK`.
    #[must_use]
    pub fn into_response(&self) -> Response {
        let state = self.state.lock();
        let mut response = Response::new(Full::new(Bytes::copy_from_slice(&state.body)));
        *response.status_mut() = state.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = state.headers.clone();
        response
    }
}
