//! In-memory client.

use std::future::Future;
use std::sync::Arc;

use archytas_core::{BoxFuture, Request, Response};
use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// The service under test.
pub type TestService = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Sends requests to a service without a network.
///
/// ```
/// use archytas_test::TestClient;
/// use http::StatusCode;
///
/// # tokio_test_block(async {
/// let client = TestClient::fixed_response(StatusCode::CREATED, "created");
/// let response = client.post("/api/todo").send().await.unwrap();
/// response.assert_status(StatusCode::CREATED).assert_body_eq("created");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[must_use]
pub struct TestClient {
    service: TestService,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps a service function.
    pub fn new<F, Fut>(service: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            service: Arc::new(move |request| Box::pin(service(request))),
            default_headers: Vec::new(),
        }
    }

    /// A service that always answers with `status` and `body`.
    pub fn fixed_response(status: StatusCode, body: impl Into<String>) -> Self {
        let body = Bytes::from(body.into());
        Self::new(move |_request| {
            let body = body.clone();
            async move {
                let mut response = Response::new(Full::new(body));
                *response.status_mut() = status;
                response
            }
        })
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    async fn dispatch(&self, request: Request) -> Result<TestResponse, TestError> {
        let response = (self.service)(request).await;
        TestResponse::from_http(response).await
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request bound to a [`TestClient`].
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    #[must_use]
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    pub async fn send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> TestClient {
        TestClient::new(|request: Request| async move {
            let custom = request
                .headers()
                .get("x-custom")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_string();
            let body = serde_json::json!({
                "method": request.method().as_str(),
                "path": request.uri().path(),
                "custom": custom,
            });
            Response::new(Full::new(Bytes::from(body.to_string())))
        })
    }

    #[tokio::test]
    async fn test_echo() {
        let client = echo();
        let response = client.delete("/api/todo/1").send().await.unwrap();
        let body = response.json_value().unwrap();
        assert_eq!(body["method"], "DELETE");
        assert_eq!(body["path"], "/api/todo/1");
        assert_eq!(body["custom"], "none");
    }

    #[tokio::test]
    async fn test_default_headers() {
        let client = echo().with_default_header("X-Custom", "default-value");
        let response = client.get("/").send().await.unwrap();
        assert_eq!(response.json_value().unwrap()["custom"], "default-value");

        let response = client
            .get("/")
            .header("X-Custom", "override")
            .send()
            .await
            .unwrap();
        assert_eq!(response.json_value().unwrap()["custom"], "override");
    }

    #[tokio::test]
    async fn test_build_errors_are_returned() {
        let client = echo();
        let result = client.get("/").header("bad header", "x").send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}
