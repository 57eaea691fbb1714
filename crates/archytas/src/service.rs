//! Request dispatch over a prepared mux.

use std::fmt;
use std::sync::Arc;

use archytas_core::{
    ChainError, Exchange, HttpError, HttpErrorResponse, Request, Response, ResponseWriter,
    RouteDefinition,
};
use archytas_middleware::Pipeline;
use archytas_router::Params;
use archytas_telemetry::request_span;
use http::StatusCode;
use tracing::{debug, error, warn, Instrument};

/// A prepared mux. Cloning is cheap; clones share the route table and chain.
#[derive(Clone)]
pub struct MuxService {
    inner: Arc<Inner>,
}

struct Inner {
    routes: Vec<RouteDefinition>,
    pipeline: Pipeline,
    debug: bool,
}

enum Lookup<'a> {
    Found(&'a RouteDefinition, Params),
    MethodNotAllowed,
    NotFound,
}

impl MuxService {
    pub(crate) fn new(routes: Vec<RouteDefinition>, pipeline: Pipeline, debug: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                routes,
                pipeline,
                debug,
            }),
        }
    }

    /// Every route, in match order.
    #[must_use]
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.inner.routes
    }

    /// The frozen middleware chain.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Serves one request.
    ///
    /// The first route whose method (or `*`) and template match wins. A
    /// path that matches only under other methods answers 405, anything
    /// else unmatched answers 404. An error that escapes the chain before
    /// anything was written becomes a 500 `{"code","message"}` body.
    pub async fn serve(&self, request: Request) -> Response {
        let method = request.method().as_str().to_string();
        let path = request.uri().path().to_string();

        let exchange = Exchange::new(request).with_debug(self.inner.debug);
        let writer = exchange.writer().clone();
        let span = request_span(&exchange.request_id(), &method, &path);

        match self.lookup(&method, &path) {
            Lookup::Found(route, params) => {
                let exchange = if params.is_empty() {
                    exchange
                } else {
                    exchange.with_path_params(params)
                };
                let handler = Arc::clone(route.container().handler());
                let result = self
                    .inner
                    .pipeline
                    .run(exchange, handler)
                    .instrument(span.clone())
                    .await;
                if let Err(err) = result {
                    let _entered = span.enter();
                    escaped(&writer, &err);
                }
            }
            Lookup::MethodNotAllowed => {
                let _entered = span.enter();
                debug!("no route for method");
                write_envelope(
                    &writer,
                    StatusCode::METHOD_NOT_ALLOWED,
                    &format!("method {method} not allowed on {path}"),
                );
            }
            Lookup::NotFound => {
                let _entered = span.enter();
                debug!("no route for path");
                write_envelope(&writer, StatusCode::NOT_FOUND, &format!("not found: {path}"));
            }
        }

        let status = writer.status().unwrap_or(StatusCode::OK);
        span.record("http.status_code", status.as_u16());
        writer.into_response()
    }

    fn lookup(&self, method: &str, path: &str) -> Lookup<'_> {
        let mut path_matched = false;
        for route in &self.inner.routes {
            let Some(params) = route.template().match_path(path) else {
                continue;
            };
            if route.matches_method(method) {
                return Lookup::Found(route, params);
            }
            path_matched = true;
        }
        if path_matched {
            Lookup::MethodNotAllowed
        } else {
            Lookup::NotFound
        }
    }
}

impl fmt::Debug for MuxService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuxService")
            .field("routes", &self.inner.routes)
            .field("pipeline", &self.inner.pipeline)
            .field("debug", &self.inner.debug)
            .finish()
    }
}

fn escaped(writer: &ResponseWriter, err: &ChainError) {
    if writer.is_written() {
        warn!(error = %err, "error returned after the response was written");
        return;
    }
    error!(error = %err, "unhandled error");
    write_envelope(writer, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
}

fn write_envelope(writer: &ResponseWriter, status: StatusCode, message: &str) {
    let body = HttpError::new(status, message).error_message().to_string();
    writer.write_json_bytes(status, body.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServeMux;
    use archytas_core::{Context, PATH_PARAMETERS_KEY};
    use archytas_middleware::FnMiddleware;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    fn request(method: &str, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_first_matching_route_wins() {
        let mut mux = ServeMux::new();
        mux.orthodox()
            .handle("GET", "/api/todo/{id}", |w: ResponseWriter, c: Context| {
                let params = c.value_as::<Params>(PATH_PARAMETERS_KEY);
                let id = params.and_then(|p| p.get("id")).unwrap_or("?");
                w.write_text(StatusCode::OK, &format!("todo {id}"));
            })
            .unwrap()
            .handle("*", "/api/todo/{id}", |w: ResponseWriter| {
                w.write_text(StatusCode::OK, "fallback");
            })
            .unwrap();
        let service = mux.prepare().unwrap();

        let (status, text) = body(service.serve(request("GET", "/api/todo/7")).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "todo 7");

        let (_, text) = body(service.serve(request("DELETE", "/api/todo/7")).await).await;
        assert_eq!(text, "fallback");
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed() {
        let mut mux = ServeMux::new();
        mux.orthodox()
            .handle("GET", "/api/todo", |_w: ResponseWriter| ())
            .unwrap();
        let service = mux.prepare().unwrap();

        let (status, text) = body(service.serve(request("GET", "/api/nope")).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(text, r#"{"code":404,"message":"not found: /api/nope"}"#);

        let (status, text) = body(service.serve(request("POST", "/api/todo")).await).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(text.contains("\"code\":405"));
    }

    #[tokio::test]
    async fn test_escaped_error_becomes_envelope() {
        let mut mux = ServeMux::new();
        mux.middleware(FnMiddleware::new("deny", |_bubble| {
            Box::pin(async { Err(HttpError::bad_request("denied").into()) })
        }))
        .handle("GET", "/", |_w: ResponseWriter| ())
        .unwrap();
        let service = mux.prepare().unwrap();

        let response = service.serve(request("GET", "/")).await;
        assert_eq!(
            response.headers()["content-type"],
            archytas_core::JSON_CONTENT_TYPE
        );
        let (status, text) = body(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            text,
            r#"{"code":500,"message":"status code 400: denied"}"#
        );
    }

    #[tokio::test]
    async fn test_written_response_survives_escaped_error() {
        let mut mux = ServeMux::new();
        mux.middleware(FnMiddleware::new("write-then-fail", |bubble| {
            Box::pin(async move {
                bubble.writer().write_text(StatusCode::ACCEPTED, "partial");
                Err(HttpError::internal("late").into())
            })
        }))
        .handle("GET", "/", |_w: ResponseWriter| ())
        .unwrap();
        let service = mux.prepare().unwrap();

        let (status, text) = body(service.serve(request("GET", "/")).await).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(text, "partial");
    }
}
