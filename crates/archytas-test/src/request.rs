//! Request builder.

use archytas_core::Request;
use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use http_body_util::Full;
use serde::Serialize;

use crate::error::TestError;

/// Builds an in-memory [`Request`].
///
/// Invalid headers or bodies are remembered and reported by
/// [`TestRequestBuilder::build`], so calls chain without intermediate
/// results.
///
/// ```
/// use archytas_test::TestRequestBuilder;
///
/// let request = TestRequestBuilder::post("/api/todo")
///     .json(&serde_json::json!({"text": "Hi!"}))
///     .build()
///     .unwrap();
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.headers()["content-type"], "application/json");
/// ```
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<String>,
}

impl TestRequestBuilder {
    /// Creates a builder for `method` and `uri`.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// GET request.
    pub fn get(uri: impl AsRef<str>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// POST request.
    pub fn post(uri: impl AsRef<str>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// PUT request.
    pub fn put(uri: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Sets a header, replacing earlier values.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(format!("header name: {e}")),
            (_, Err(e)) => self.fail(format!("header value: {e}")),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => self.fail(format!("json body: {e}")),
        }
        self.content_type("application/json")
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    /// Builds the request.
    pub fn build(self) -> Result<Request, TestError> {
        if let Some(message) = self.error {
            return Err(if message.starts_with("header") {
                TestError::InvalidHeader(message)
            } else {
                TestError::RequestBuild(message)
            });
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        let mut request = http::Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_build_with_body() {
        let request = TestRequestBuilder::put("/api/todo/5?offset=10")
            .header("X-Request-Id", "abc")
            .body("{\"text\":\"Hi!\"}")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.uri().path(), "/api/todo/5");
        assert_eq!(request.uri().query(), Some("offset=10"));
        assert_eq!(request.headers()["x-request-id"], "abc");
        let body = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"{\"text\":\"Hi!\"}"));
    }

    #[test]
    fn test_invalid_header_is_reported_on_build() {
        let err = TestRequestBuilder::get("/")
            .header("bad header", "x")
            .header("X-Ok", "fine")
            .build()
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }

    #[test]
    fn test_invalid_uri() {
        let err = TestRequestBuilder::get("http://[::1").build().unwrap_err();
        assert!(matches!(err, TestError::RequestBuild(_)));
    }
}
