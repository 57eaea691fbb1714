//! A small todo API served in memory.
//!
//! Run with `cargo run -p archytas --example todo_api`. Settings can be
//! overridden through `TODO__*` variables, for example
//! `TODO__LOGGING__FORMAT=pretty`.

use std::sync::Arc;

use archytas::prelude::*;
use archytas::telemetry::TelemetryError;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Reflect)]
struct Todo {
    #[serde(with = "archytas::core::as_string")]
    #[api(as_string, description = "todo id")]
    id: i64,
    #[api(required, max_len = 140)]
    text: String,
    #[api(enum = "open|done")]
    status: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct TodoId {
    #[api(in = "path")]
    id: i64,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct ListTodos {
    #[api(in = "query", min = 0)]
    offset: usize,
    #[api(in = "query", min = 1, max = 100)]
    limit: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct CreateTodo {
    #[api(required, max_len = 140)]
    text: String,
}

#[derive(Default)]
struct Store {
    next_id: i64,
    todos: Vec<Todo>,
}

type Shared = Arc<Mutex<Store>>;

fn not_found(id: i64) -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, format!("todo {id} not found"))
}

fn routes(mux: &mut ServeMux, store: &Shared) -> Result<(), MuxError> {
    let list = Arc::clone(store);
    mux.handle_container(
        "GET",
        "/api/todo",
        HandlerInfo::new(move |req: Box<ListTodos>| -> Vec<Todo> {
            let limit = if req.limit == 0 { 20 } else { req.limit };
            list.lock()
                .todos
                .iter()
                .skip(req.offset)
                .take(limit)
                .cloned()
                .collect()
        })
        .summary("list todos")
        .tag("todo"),
    )?;

    let get = Arc::clone(store);
    mux.handle_container(
        "GET",
        "/api/todo/{id}",
        HandlerInfo::new(move |req: Box<TodoId>| -> Result<Box<Todo>, HttpError> {
            get.lock()
                .todos
                .iter()
                .find(|t| t.id == req.id)
                .cloned()
                .map(Box::new)
                .ok_or_else(|| not_found(req.id))
        })
        .summary("get a todo")
        .tag("todo"),
    )?;

    let create = Arc::clone(store);
    mux.handle_container(
        "POST",
        "/api/todo",
        HandlerInfo::new(move |req: Box<CreateTodo>| -> Box<Todo> {
            let mut store = create.lock();
            store.next_id += 1;
            let todo = Todo {
                id: store.next_id,
                text: req.text.clone(),
                status: "open".to_string(),
            };
            store.todos.push(todo.clone());
            Box::new(todo)
        })
        .summary("create a todo")
        .tag("todo"),
    )?;

    let done = Arc::clone(store);
    mux.handle_container(
        "PUT",
        "/api/todo/{id}/done",
        HandlerInfo::new(move |req: Box<TodoId>| -> Result<Box<Todo>, HttpError> {
            let mut store = done.lock();
            let todo = store
                .todos
                .iter_mut()
                .find(|t| t.id == req.id)
                .ok_or_else(|| not_found(req.id))?;
            todo.status = "done".to_string();
            Ok(Box::new(todo.clone()))
        })
        .summary("complete a todo")
        .tag("todo"),
    )?;

    let delete = Arc::clone(store);
    mux.handle(
        "DELETE",
        "/api/todo/{id}",
        move |req: Box<TodoId>| -> Result<(), HttpError> {
            let mut store = delete.lock();
            let before = store.todos.len();
            store.todos.retain(|t| t.id != req.id);
            if store.todos.len() == before {
                return Err(not_found(req.id));
            }
            Ok(())
        },
    )?;

    Ok(())
}

async fn call(service: &MuxService, method: &str, uri: &str, body: &str) -> anyhow::Result<()> {
    let request = http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))?;
    let response = service.serve(request).await;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    info!(%method, %uri, status = status.as_u16(), body = %String::from_utf8_lossy(&body), "call");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_defaults()
        .with_env_prefix("TODO")
        .load()?;
    match init_logging(&config.logging.to_log_config()) {
        Ok(()) | Err(TelemetryError::LoggingInit(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let store: Shared = Arc::default();
    let mut mux = ServeMux::from_config(&config)?;
    mux.middleware(RequestValidator::new(SchemaValidator::new()));
    routes(&mut mux, &store)?;
    let service = mux.prepare()?;

    call(&service, "POST", "/api/todo", r#"{"text":"write docs"}"#).await?;
    call(&service, "POST", "/api/todo", r#"{"text":""}"#).await?;
    call(&service, "PUT", "/api/todo/1/done", "").await?;
    call(&service, "GET", "/api/todo?limit=10", "").await?;
    call(&service, "GET", "/api/todo/9", "").await?;
    call(&service, "DELETE", "/api/todo/1", "").await?;
    call(&service, "PATCH", "/api/todo/1", "").await?;
    call(&service, "GET", &config.docs.endpoint, "").await?;

    Ok(())
}
