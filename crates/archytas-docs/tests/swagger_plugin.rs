//! Scanning routes into a Swagger document and serving it.

use std::sync::Arc;

use archytas_core::{
    BasicContainer, Context, ErrorClass, Exchange, Handler, HandlerError, HandlersScannerPlugin,
    HttpError, Reflect, RouteDefinition,
};
use archytas_docs::{
    HandlerInfo, Object, ParameterIn, SchemaType, SwaggerOptions, SwaggerPlugin, Tag,
    DEFAULT_ENDPOINT,
};
use archytas_middleware::Pipeline;
use archytas_router::PathTemplate;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct ReqSwaggerParameter {
    #[api(in = "path")]
    id: i32,
    #[api(in = "query")]
    limit: i32,
    #[api(in = "query")]
    offset: i32,
    #[serde(skip)]
    ignored: i32,
    #[api(in = "query")]
    list: Vec<String>,
}

#[derive(Debug, Serialize, Reflect)]
#[serde(rename_all = "camelCase")]
struct Resp {
    #[serde(with = "archytas_core::as_string")]
    #[api(as_string)]
    id: i64,
    done: bool,
    content: Option<Box<RespSub>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Reflect)]
#[serde(rename_all = "camelCase")]
struct RespSub {
    #[serde(with = "archytas_core::as_string")]
    #[api(as_string)]
    id: i64,
    text: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct Noop {}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct RecursiveNode {
    children: Vec<RecursiveNode>,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct RecursiveWrapper {
    nodes: Vec<RecursiveNode>,
}

#[derive(Debug, Default, Serialize, Deserialize, Reflect)]
struct UpdateTodo {
    id: i64,
    text: String,
}

#[derive(Debug, Serialize, Reflect)]
struct Todo {
    id: i64,
    text: String,
}

#[derive(Debug, Serialize, Reflect)]
struct Conflict {
    reason: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conflict: {}", self.reason)
    }
}

impl HandlerError for Conflict {
    fn error_class() -> ErrorClass {
        ErrorClass::of::<Self>()
    }
}

fn route<H, Args>(method: &str, template: &str, handler: H) -> RouteDefinition
where
    H: Handler<Args>,
    Args: 'static,
{
    RouteDefinition::new(
        method,
        PathTemplate::parse(template).unwrap(),
        Arc::new(BasicContainer::new(handler)),
    )
}

fn plugin() -> SwaggerPlugin {
    SwaggerPlugin::new(Object::new("test", "test"))
}

fn scan(plugin: &mut SwaggerPlugin, routes: &[RouteDefinition]) -> Vec<RouteDefinition> {
    let mut registered = Vec::new();
    plugin.handlers_scan(&mut registered, routes).unwrap();
    registered
}

#[test]
fn documents_parameters_and_responses() {
    let mut plugin = plugin();
    scan(
        &mut plugin,
        &[route(
            "GET",
            "/api/test/{id}",
            |_c: Context, _req: Box<ReqSwaggerParameter>| -> Result<Option<Resp>, anyhow::Error> {
                Ok(None)
            },
        )],
    );
    let doc = plugin.document();
    assert_eq!(doc.swagger, "2.0");
    assert_eq!(doc.paths.len(), 1);

    let op = doc.operation("/api/test/{id}", "GET").unwrap();
    let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["id", "limit", "list", "offset"]);

    let id = &op.parameters[0];
    assert_eq!(id.location, ParameterIn::Path);
    assert!(id.required);
    assert_eq!(id.param_type, Some(SchemaType::Integer));
    assert_eq!(id.format.as_deref(), Some("int32"));

    let limit = &op.parameters[1];
    assert_eq!(limit.location, ParameterIn::Query);
    assert_eq!(limit.param_type, Some(SchemaType::Integer));

    let list = &op.parameters[2];
    assert_eq!(list.location, ParameterIn::Query);
    assert_eq!(list.param_type, Some(SchemaType::Array));
    assert_eq!(
        list.items.as_ref().unwrap().item_type,
        Some(SchemaType::String)
    );
    assert_eq!(list.collection_format.as_deref(), Some("multi"));

    assert_eq!(
        op.responses["200"].schema.as_ref().unwrap().reference_name(),
        Some("Resp")
    );
    assert!(!op.responses.contains_key("default"));

    let names: Vec<_> = doc.definitions.keys().map(String::as_str).collect();
    assert_eq!(names, ["Resp", "RespSub"]);

    let resp = &doc.definitions["Resp"];
    assert_eq!(resp.schema_type, Some(SchemaType::Object));
    assert!(resp.reference.is_none());
    assert_eq!(
        resp.properties["content"].reference.as_deref(),
        Some("#/definitions/RespSub")
    );
    assert_eq!(resp.properties["id"].schema_type, Some(SchemaType::String));

    let sub = &doc.definitions["RespSub"];
    assert_eq!(sub.properties["id"].schema_type, Some(SchemaType::String));
    assert_eq!(sub.properties["id"].format.as_deref(), Some("int64"));
    assert_eq!(sub.properties["createdAt"].schema_type, Some(SchemaType::String));
    assert_eq!(sub.properties["createdAt"].format.as_deref(), Some("date-time"));
}

#[test]
fn empty_request_objects_add_no_definitions() {
    let mut plugin = plugin();
    scan(
        &mut plugin,
        &[route(
            "GET",
            "/api/test/{id}",
            |_c: Context, _n: Box<Noop>| -> Result<(), anyhow::Error> { Ok(()) },
        )],
    );
    let doc = plugin.document();
    assert_eq!(doc.paths.len(), 1);
    assert!(doc.definitions.is_empty());
    assert!(doc.operation("/api/test/{id}", "GET").unwrap().parameters.is_empty());
}

#[test]
fn wildcard_routes_are_skipped() {
    let mut plugin = plugin();
    scan(
        &mut plugin,
        &[route(
            "*",
            "/api/test/{id}",
            |_c: Context, _req: Box<ReqSwaggerParameter>| -> Result<(), anyhow::Error> { Ok(()) },
        )],
    );
    assert!(plugin.document().paths.is_empty());
    assert!(plugin.document().definitions.is_empty());
}

#[test]
fn recursive_request_types_are_referenced() {
    let mut plugin = plugin();
    scan(
        &mut plugin,
        &[route(
            "POST",
            "/api/test",
            |_c: Context, _req: Box<RecursiveWrapper>| -> Result<(), anyhow::Error> { Ok(()) },
        )],
    );
    let doc = plugin.document();
    assert_eq!(doc.paths.len(), 1);
    assert_eq!(doc.definitions.len(), 2);

    let body = &doc.operation("/api/test", "POST").unwrap().parameters[0];
    assert_eq!(body.name, "body");
    assert_eq!(body.location, ParameterIn::Body);
    assert!(body.required);
    assert_eq!(
        body.schema.as_ref().unwrap().reference_name(),
        Some("RecursiveWrapper")
    );

    let nodes = &doc.definitions["RecursiveWrapper"].properties["nodes"];
    assert_eq!(nodes.schema_type, Some(SchemaType::Array));
    assert!(nodes.items.is_some());
    let children = &doc.definitions["RecursiveNode"].properties["children"];
    assert_eq!(children.schema_type, Some(SchemaType::Array));
    assert_eq!(
        children.items.as_ref().unwrap().reference_name(),
        Some("RecursiveNode")
    );
}

#[test]
fn template_variables_become_path_parameters() {
    let mut plugin = plugin();
    scan(
        &mut plugin,
        &[route(
            "PUT",
            "/api/todo/{id}",
            |_req: Box<UpdateTodo>| -> Result<Option<Todo>, Conflict> { Ok(None) },
        )],
    );
    let op = plugin.document().operation("/api/todo/{id}", "PUT").unwrap();

    assert_eq!(op.parameters.len(), 2);
    assert_eq!(op.parameters[0].name, "id");
    assert_eq!(op.parameters[0].location, ParameterIn::Path);
    assert_eq!(op.parameters[0].format.as_deref(), Some("int64"));
    assert_eq!(op.parameters[1].location, ParameterIn::Body);

    let default = &op.responses["default"];
    assert_eq!(default.description, "error response of PUT /api/todo/{id}");
    assert_eq!(
        default.schema.as_ref().unwrap().reference_name(),
        Some("Conflict")
    );
    let names: Vec<_> = plugin.document().definitions.keys().cloned().collect();
    assert_eq!(names, ["UpdateTodo", "Todo", "Conflict"]);
}

#[test]
fn handler_info_seeds_the_operation() {
    let mut plugin = plugin();
    let info = HandlerInfo::new(|| -> Result<Vec<Todo>, HttpError> { Ok(Vec::new()) })
        .summary("List todos")
        .description("All todos, newest first")
        .tag("todo")
        .operation_id("listTodos")
        .response("206", "partial list");
    let routes = [RouteDefinition::new(
        "GET",
        PathTemplate::parse("/api/todo").unwrap(),
        Arc::new(info),
    )];
    scan(&mut plugin, &routes);

    let op = plugin.document().operation("/api/todo", "GET").unwrap();
    assert_eq!(op.summary.as_deref(), Some("List todos"));
    assert_eq!(op.description.as_deref(), Some("All todos, newest first"));
    assert_eq!(op.tags, ["todo"]);
    assert_eq!(op.operation_id.as_deref(), Some("listTodos"));
    assert!(!op.responses.contains_key("200"));
    let schema = op.responses["206"].schema.as_ref().unwrap();
    assert_eq!(schema.schema_type, Some(SchemaType::Array));
    assert_eq!(schema.items.as_ref().unwrap().reference_name(), Some("Todo"));
}

#[test]
fn unknown_methods_abort_the_scan() {
    let mut plugin = plugin();
    let mut registered = Vec::new();
    let err = plugin
        .handlers_scan(
            &mut registered,
            &[route("TRACE", "/api/todo", || -> Result<(), HttpError> {
                Ok(())
            })],
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown method: TRACE");
    assert!(registered.is_empty());
}

#[test]
fn missing_info_aborts_the_scan() {
    let mut plugin = SwaggerPlugin::new(Object::default());
    let mut registered = Vec::new();
    let err = plugin.handlers_scan(&mut registered, &[]).unwrap_err();
    assert!(err.to_string().contains("info"));
    assert!(registered.is_empty());
}

#[test]
fn name_modifier_and_tags() {
    let mut plugin = SwaggerPlugin::with_options(SwaggerOptions {
        object: Object::new("test", "test"),
        name_modifier: Some(Arc::new(|_info: &archytas_core::TypeInfo, name: &str| {
            format!("todo.{name}")
        })),
        endpoint: "/swagger.json".to_string(),
    });
    plugin.add_tag(Tag::new("todo"));
    let registered = scan(
        &mut plugin,
        &[route("GET", "/api/todo", || -> Option<Todo> { None })],
    );

    assert_eq!(registered[0].template().as_str(), "/swagger.json");
    let doc = plugin.document();
    assert!(doc.definitions.contains_key("todo.Todo"));
    assert_eq!(doc.tags[0].name, "todo");
    assert_eq!(
        doc.operation("/api/todo", "GET").unwrap().responses["200"]
            .schema
            .as_ref()
            .unwrap()
            .reference
            .as_deref(),
        Some("#/definitions/todo.Todo")
    );
}

#[tokio::test]
async fn serves_the_document_after_the_scan() {
    let mut plugin = plugin();
    let routes = [route("GET", "/api/todo", || -> Option<Todo> { None })];
    let registered = scan(&mut plugin, &routes);

    assert_eq!(registered.len(), 1);
    let endpoint = &registered[0];
    assert_eq!(endpoint.method(), "GET");
    assert_eq!(endpoint.template().as_str(), DEFAULT_ENDPOINT);
    assert!(plugin.document().paths.get(DEFAULT_ENDPOINT).is_none());

    let exchange = Exchange::new(
        http::Request::builder()
            .uri(DEFAULT_ENDPOINT)
            .body(Full::new(Bytes::new()))
            .unwrap(),
    );
    let writer = exchange.writer().clone();
    Pipeline::builder()
        .orthodox()
        .build()
        .run(exchange, endpoint.container().handler().clone())
        .await
        .unwrap();

    assert_eq!(writer.status(), Some(StatusCode::OK));
    let body: serde_json::Value = serde_json::from_str(&writer.body_string()).unwrap();
    assert_eq!(body["swagger"], "2.0");
    assert_eq!(body["info"]["title"], "test");
    assert_eq!(body["definitions"]["Todo"]["type"], "object");
    assert_eq!(
        body["paths"]["/api/todo"]["get"]["responses"]["200"]["schema"]["$ref"],
        "#/definitions/Todo"
    );
}
