//! Serving through a prepared mux, end to end.

use std::sync::Arc;

use archytas::core::{BasicContainer, HandlersScannerPlugin, RouteDefinition, RouteRegistrar};
use archytas::prelude::*;
use archytas::router::PathTemplate;
use archytas_test::TestClient;
use http::StatusCode;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct Greet {
    #[api(in = "path")]
    name: String,
    #[api(in = "query")]
    times: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct Greeting {
    text: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct Note {
    #[api(required, max_len = 8)]
    text: String,
}

fn client(service: MuxService) -> TestClient {
    TestClient::new(move |request| {
        let service = service.clone();
        async move { service.serve(request).await }
    })
}

fn greet(req: Box<Greet>) -> Result<Box<Greeting>, HttpError> {
    if req.times < 0 {
        return Err(HttpError::bad_request("times must not be negative"));
    }
    let times = usize::try_from(req.times.max(1)).unwrap_or(1);
    Ok(Box::new(Greeting {
        text: vec![format!("hello {}", req.name); times].join(", "),
    }))
}

#[tokio::test]
async fn binds_path_and_query_into_the_request_object() {
    let mut mux = ServeMux::new();
    mux.orthodox().handle("GET", "/greet/{name}", greet).unwrap();
    let client = client(mux.prepare().unwrap());

    client
        .get("/greet/ada?times=2")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "application/json; charset=UTF-8")
        .assert_json_eq(&json!({"text": "hello ada, hello ada"}));
}

#[tokio::test]
async fn handler_errors_render_with_their_status() {
    let mut mux = ServeMux::new();
    mux.orthodox().handle("GET", "/greet/{name}", greet).unwrap();
    let client = client(mux.prepare().unwrap());

    client
        .get("/greet/ada?times=-1")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_eq(&json!({"code": 400, "message": "times must not be negative"}));

    let response = client.get("/greet/ada?times=many").send().await.unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json_value().unwrap()["code"], 400);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let mut mux = ServeMux::new();
    mux.orthodox()
        .handle("POST", "/notes", |note: Box<Note>| -> Box<Note> { note })
        .unwrap();
    let client = client(mux.prepare().unwrap());

    client
        .post("/notes")
        .json(&json!({"text": "hi"}))
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({"text": "hi"}));

    client
        .post("/notes")
        .content_type("application/json")
        .body("{\"text\":")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schema_validation_runs_after_binding() {
    let mut mux = ServeMux::new();
    mux.orthodox()
        .middleware(RequestValidator::new(SchemaValidator::new()))
        .handle("POST", "/notes", |note: Box<Note>| -> Box<Note> { note })
        .unwrap();
    let client = client(mux.prepare().unwrap());

    let response = client
        .post("/notes")
        .json(&json!({"text": "far too long"}))
        .send()
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json_value().unwrap()["message"]
        .as_str()
        .unwrap()
        .contains("text"));

    client
        .post("/notes")
        .json(&json!({"text": "short"}))
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn middleware_runs_in_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut mux = ServeMux::new();
    for name in ["first", "second"] {
        let order = Arc::clone(&order);
        mux.middleware(FnMiddleware::new(name, move |bubble| {
            order.lock().push(name);
            bubble.next()
        }));
    }
    mux.orthodox()
        .handle("GET", "/", |w: ResponseWriter| {
            w.write_text(StatusCode::OK, "ok");
        })
        .unwrap();
    let service = mux.prepare().unwrap();
    assert_eq!(
        service.pipeline().stage_names(),
        [
            "first",
            "second",
            "http_rw_binder",
            "context_binder",
            "response_mapper",
            "request_object_mapper"
        ]
    );

    client(service)
        .get("/")
        .send()
        .await
        .unwrap()
        .assert_body_eq("ok");
    assert_eq!(*order.lock(), ["first", "second"]);
}

#[tokio::test]
async fn config_mounts_the_swagger_endpoint() {
    let mut config = ArchytasConfig::default();
    config.docs.title = "Greeter".to_string();
    config.docs.endpoint = "/docs/swagger.json".to_string();

    let mut mux = ServeMux::from_config(&config).unwrap();
    mux.handle("GET", "/greet/{name}", greet).unwrap();
    let service = mux.prepare().unwrap();
    assert_eq!(service.routes().len(), 2);

    let response = client(service)
        .get("/docs/swagger.json")
        .send()
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);
    let doc = response.json_value().unwrap();
    assert_eq!(doc["swagger"], "2.0");
    assert_eq!(doc["info"]["title"], "Greeter");
    assert!(doc["paths"]["/greet/{name}"]["get"].is_object());
    assert!(doc["paths"].get("/docs/swagger.json").is_none());
    assert!(doc["definitions"]["Greeting"].is_object());
}

struct Health;

impl HandlersScannerPlugin for Health {
    fn name(&self) -> &str {
        "health"
    }

    fn handlers_scan(
        &mut self,
        registrar: &mut dyn RouteRegistrar,
        routes: &[RouteDefinition],
    ) -> anyhow::Result<()> {
        let count = routes.len();
        registrar.register_route(RouteDefinition::new(
            "GET",
            PathTemplate::parse("/health")?,
            Arc::new(BasicContainer::new(move |w: ResponseWriter| {
                w.write_text(StatusCode::OK, &format!("{count} routes"));
            })),
        ));
        Ok(())
    }
}

struct Refuse;

impl HandlersScannerPlugin for Refuse {
    fn name(&self) -> &str {
        "refuse"
    }

    fn handlers_scan(
        &mut self,
        _registrar: &mut dyn RouteRegistrar,
        routes: &[RouteDefinition],
    ) -> anyhow::Result<()> {
        anyhow::bail!("{} routes is too many", routes.len())
    }
}

#[tokio::test]
async fn plugins_may_register_routes() {
    let mut mux = ServeMux::new();
    mux.orthodox()
        .plugin(Health)
        .handle("GET", "/greet/{name}", greet)
        .unwrap();
    let client = client(mux.prepare().unwrap());

    client
        .get("/health")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_body_eq("1 routes");
}

#[test]
fn failing_plugins_abort_prepare() {
    let mut mux = ServeMux::new();
    mux.plugin(Refuse).handle("GET", "/", greet).unwrap();

    match mux.prepare() {
        Err(MuxError::Plugin { name, message }) => {
            assert_eq!(name, "refuse");
            assert_eq!(message, "1 routes is too many");
        }
        other => panic!("expected a plugin error, got {other:?}"),
    }
}
