//! Response wrapper with assertion helpers.

use std::fmt;

use archytas_core::ResponseWriter;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A buffered response.
#[derive(Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects an HTTP response.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Snapshot of what has been written to `writer` so far.
    ///
    /// An untouched writer reads as an empty `200 OK`.
    #[must_use]
    pub fn from_writer(writer: &ResponseWriter) -> Self {
        Self {
            status: writer.status().unwrap_or(StatusCode::OK),
            headers: writer.headers(),
            body: writer.body(),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns all headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a JSON value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {} with body {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(actual, expected, "Header '{name}' mismatch");
        self
    }

    /// Asserts the exact body.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        assert_eq!(
            String::from_utf8_lossy(&self.body),
            expected.as_ref(),
            "Body mismatch"
        );
        self
    }

    /// Asserts the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or doesn't match.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual = self
            .json_value()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_from_http() {
        let response = http::Response::builder()
            .status(StatusCode::CREATED)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{\"id\":1}")))
            .unwrap();
        let response = TestResponse::from_http(response).await.unwrap();

        response
            .assert_status(StatusCode::CREATED)
            .assert_header("content-type", "application/json")
            .assert_json_eq(&serde_json::json!({"id": 1}));
        assert_eq!(response.status_code(), 201);
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_from_writer() {
        let writer = ResponseWriter::new();
        let untouched = TestResponse::from_writer(&writer);
        assert_eq!(untouched.status(), StatusCode::OK);
        assert!(untouched.body().is_empty());

        writer.write_text(StatusCode::BAD_REQUEST, "nope");
        let response = TestResponse::from_writer(&writer);
        response
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_body_eq("nope");
        assert!(response.json_value().is_err());
    }
}
