//! End-to-end tests of the orthodox chain.
//!
//! Each test builds a real request, stores path parameters the way the mux
//! does and runs a handler through the full chain.

use std::sync::Arc;

use archytas_core::{
    into_handler, BoxedHandler, Context, Exchange, HttpError, Reflect, Request, ResponseWriter,
    PATH_PARAMETERS_KEY,
};
use archytas_middleware::{Pipeline, RequestObjectMapper, RequestValidator};
use archytas_router::Params;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use http_body_util::Full;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize, Reflect)]
struct TodoRequest {
    id: i64,
    offset: i32,
    text: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Reflect)]
struct ListRequest {
    list: Vec<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Reflect)]
struct RevisionRequest {
    #[serde(with = "archytas_core::as_string")]
    #[api(as_string)]
    id: i64,
    #[serde(with = "archytas_core::as_string")]
    #[api(as_string)]
    rev: u32,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct CreateRequest {
    #[api(enum = "todo|done")]
    status: String,
}

fn request(method: &str, uri: &str, body: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn with_path(exchange: Exchange, params: &[(&str, &str)]) -> Exchange {
    let params: Params = params.iter().copied().collect();
    let context = exchange.context().with_value(PATH_PARAMETERS_KEY, params);
    exchange.with_context(context)
}

async fn run(pipeline: &Pipeline, exchange: Exchange, handler: BoxedHandler) -> ResponseWriter {
    let writer = exchange.writer().clone();
    pipeline.run(exchange, handler).await.unwrap();
    writer
}

#[tokio::test]
async fn binds_path_query_and_body() {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let handler = into_handler(move |req: Box<TodoRequest>| -> Option<TodoRequest> {
        *sink.lock() = Some((*req).clone());
        Some(*req)
    });

    let exchange = with_path(
        Exchange::new(request(
            "POST",
            "/api/todo/5?offset=10&limit=3",
            r#"{"text":"Hi!"}"#,
        )),
        &[("id", "5")],
    );
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;

    let req = seen.lock().clone().unwrap();
    assert_eq!(req.id, 5);
    assert_eq!(req.offset, 10);
    assert_eq!(req.text, "Hi!");
    assert_eq!(writer.status(), Some(StatusCode::OK));
    assert_eq!(writer.body_string(), r#"{"id":5,"offset":10,"text":"Hi!"}"#);
}

#[tokio::test]
async fn body_overrides_query() {
    let handler = into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });
    let exchange = Exchange::new(request("POST", "/api/todo?offset=1", r#"{"offset":2}"#));
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;
    assert_eq!(writer.body_string(), r#"{"id":0,"offset":2,"text":""}"#);
}

#[tokio::test]
async fn repeated_query_keys_fill_sequences() {
    let handler = into_handler(|req: Box<ListRequest>| -> Option<Vec<String>> { Some(req.list) });
    let exchange = Exchange::new(request("GET", "/api/list?list=a&list=b", ""));
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;
    assert_eq!(writer.body_string(), r#"["a","b"]"#);
}

#[tokio::test]
async fn wrong_typed_path_parameter_is_bad_request() {
    let handler = into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });
    let exchange = with_path(
        Exchange::new(request("POST", "/api/todo/test", r#"{"text": "Hi!"}"#)),
        &[("id", "test")],
    );
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;

    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
    let body: serde_json::Value = serde_json::from_str(&writer.body_string()).unwrap();
    assert_eq!(body["code"], 400);
    assert!(body["message"].as_str().unwrap().contains("`id`"));
}

#[tokio::test]
async fn unknown_path_parameter_is_server_error() {
    let handler = into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });
    let exchange = with_path(
        Exchange::new(request("GET", "/api/todo/5", "")),
        &[("todo_id", "5")],
    );
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;
    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn foreign_path_parameter_store_is_server_error() {
    let handler = into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });
    let exchange = Exchange::new(request("GET", "/api/todo/5", ""));
    let context = exchange
        .context()
        .with_value(PATH_PARAMETERS_KEY, vec![("id".to_string(), "5".to_string())]);
    let exchange = exchange.with_context(context);
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;

    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(
        writer.body_string(),
        r#"{"code":500,"message":"path parameters must be stored as archytas_router::Params"}"#
    );
}

#[tokio::test]
async fn string_encoded_numbers_bind_from_every_source() {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let handler = move || {
        let sink = Arc::clone(&sink);
        into_handler(move |req: Box<RevisionRequest>| -> Option<RevisionRequest> {
            *sink.lock() = Some((*req).clone());
            Some(*req)
        })
    };
    let pipeline = Pipeline::builder().orthodox().build();

    let exchange = with_path(
        Exchange::new(request("GET", "/api/todo/5?rev=2", "")),
        &[("id", "5")],
    );
    let writer = run(&pipeline, exchange, handler()).await;
    assert_eq!(writer.status(), Some(StatusCode::OK));
    assert_eq!(writer.body_string(), r#"{"id":"5","rev":"2"}"#);
    let req = seen.lock().take().unwrap();
    assert_eq!((req.id, req.rev), (5, 2));

    let exchange = Exchange::new(request("PUT", "/api/todo", r#"{"id":"7","rev":3}"#));
    let writer = run(&pipeline, exchange, handler()).await;
    assert_eq!(writer.body_string(), r#"{"id":"7","rev":"3"}"#);

    let exchange = with_path(
        Exchange::new(request("GET", "/api/todo/x", "")),
        &[("id", "x")],
    );
    let writer = run(&pipeline, exchange, handler()).await;
    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let handler = into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });
    let exchange = Exchange::new(request("POST", "/api/todo", r#"{"text": 12"#));
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;
    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn two_byte_bodies_are_skipped_unless_strict() {
    let handler = || into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });

    let lenient = Pipeline::builder().orthodox().build();
    let writer = run(
        &lenient,
        Exchange::new(request("POST", "/api/todo?offset=3", "[]")),
        handler(),
    )
    .await;
    assert_eq!(writer.body_string(), r#"{"id":0,"offset":3,"text":""}"#);

    let strict = Pipeline::builder()
        .orthodox_with(RequestObjectMapper::new().strict_bodies(true))
        .build();
    let writer = run(
        &strict,
        Exchange::new(request("POST", "/api/todo", "[]")),
        handler(),
    )
    .await;
    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn non_json_bodies_are_ignored() {
    let handler = into_handler(|req: Box<TodoRequest>| -> Option<TodoRequest> { Some(*req) });
    let exchange = Exchange::new(
        http::Request::builder()
            .method("POST")
            .uri("/api/todo?text=query")
            .header(CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from_static(b"{\"text\":\"body\"}")))
            .unwrap(),
    );
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(&pipeline, exchange, handler).await;
    assert_eq!(writer.body_string(), r#"{"id":0,"offset":0,"text":"query"}"#);
}

#[tokio::test]
async fn validation_failures_are_rendered() {
    let handler = into_handler(|_req: Box<CreateRequest>, _ctx: Context| ());
    let pipeline = Pipeline::builder()
        .orthodox()
        .with(RequestValidator::default())
        .build();

    let writer = run(
        &pipeline,
        Exchange::new(request("POST", "/api/todo", r#"{"status":"lost"}"#)),
        handler,
    )
    .await;
    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(
        writer.body_string(),
        r#"{"message":"status: `lost` is not one of [todo, done]"}"#
    );
}

#[tokio::test]
async fn handler_errors_render_with_their_status() {
    let handler = into_handler(|w: ResponseWriter| -> Result<(), HttpError> {
        w.set_header(
            http::header::CACHE_CONTROL,
            http::HeaderValue::from_static("no-store"),
        );
        Err(HttpError::new(StatusCode::CONFLICT, "already exists"))
    });
    let pipeline = Pipeline::builder().orthodox().build();
    let writer = run(
        &pipeline,
        Exchange::new(request("PUT", "/api/todo/1", "")),
        handler,
    )
    .await;

    assert_eq!(writer.status(), Some(StatusCode::CONFLICT));
    assert_eq!(writer.header(&http::header::CACHE_CONTROL).unwrap(), "no-store");
    assert_eq!(
        writer.body_string(),
        r#"{"code":409,"message":"already exists"}"#
    );
}
