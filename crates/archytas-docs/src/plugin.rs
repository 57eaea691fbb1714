//! The swagger scanner plugin and the documented handler container.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use archytas_core::{
    into_handler, BasicContainer, BoxedHandler, Handler, HandlerContainer, HandlersScannerPlugin,
    ResponseWriter, RouteDefinition, RouteRegistrar, ANY_METHOD,
};
use archytas_router::PathTemplate;
use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, info};

use crate::assembler::{OperationAssembler, OPERATION_KEY};
use crate::error::{DocsError, DocsResult};
use crate::openapi::{Object, Operation, Response, Tag};
use crate::registry::{DefinitionNameModifier, SchemaRegistry};

/// Path the document is served at unless configured otherwise.
pub const DEFAULT_ENDPOINT: &str = "/api/swagger.json";

/// Settings of a [`SwaggerPlugin`].
#[derive(Clone)]
pub struct SwaggerOptions {
    /// Seed document: info, tags, base path, hand-written definitions.
    pub object: Object,
    /// Renames definitions.
    pub name_modifier: Option<DefinitionNameModifier>,
    /// Path of the document endpoint.
    pub endpoint: String,
}

impl Default for SwaggerOptions {
    fn default() -> Self {
        Self {
            object: Object::default(),
            name_modifier: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl fmt::Debug for SwaggerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwaggerOptions")
            .field("object", &self.object)
            .field("name_modifier", &self.name_modifier.is_some())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Builds a Swagger 2.0 document from every registered route and serves it.
///
/// The document endpoint is registered after the scan, so it never
/// documents itself.
///
/// ```rust
/// use archytas_core::{HandlersScannerPlugin, HttpError, Reflect, RouteDefinition};
/// use archytas_docs::{HandlerInfo, Object, SwaggerPlugin};
/// use archytas_router::PathTemplate;
/// use std::sync::Arc;
///
/// #[derive(serde::Serialize, Reflect)]
/// struct Todo {
///     id: i64,
/// }
///
/// let routes = vec![RouteDefinition::new(
///     "GET",
///     PathTemplate::parse("/api/todo").unwrap(),
///     Arc::new(HandlerInfo::new(|| -> Result<Vec<Todo>, HttpError> { Ok(vec![]) })),
/// )];
///
/// let mut plugin = SwaggerPlugin::new(Object::new("todo", "1.0"));
/// let mut registered = Vec::new();
/// plugin.handlers_scan(&mut registered, &routes).unwrap();
///
/// assert_eq!(registered[0].template().as_str(), "/api/swagger.json");
/// assert!(plugin.document().definitions.contains_key("Todo"));
/// ```
pub struct SwaggerPlugin {
    document: Object,
    registry: SchemaRegistry,
    endpoint: String,
}

impl SwaggerPlugin {
    /// Creates a plugin seeded with `object`.
    #[must_use]
    pub fn new(object: Object) -> Self {
        Self::with_options(SwaggerOptions {
            object,
            ..SwaggerOptions::default()
        })
    }

    /// Creates a plugin from options.
    #[must_use]
    pub fn with_options(options: SwaggerOptions) -> Self {
        let registry = match options.name_modifier {
            Some(modifier) => SchemaRegistry::new().with_name_modifier(modifier),
            None => SchemaRegistry::new(),
        };
        Self {
            document: options.object,
            registry,
            endpoint: options.endpoint,
        }
    }

    /// Path of the document endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The document built so far.
    #[must_use]
    pub fn document(&self) -> &Object {
        &self.document
    }

    /// The schema registry, for registering fixed type schemas before the scan.
    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    /// Adds a top-level tag.
    pub fn add_tag(&mut self, tag: Tag) -> &Tag {
        self.document.tags.push(tag);
        &self.document.tags[self.document.tags.len() - 1]
    }

    /// Documents one route.
    ///
    /// Wildcard routes are skipped; methods Swagger 2.0 has no slot for are
    /// an error.
    pub fn process_route(&mut self, route: &RouteDefinition) -> DocsResult<()> {
        let method = route.method();
        if method == ANY_METHOD {
            debug!(path = route.template().as_str(), "wildcard route not documented");
            return Ok(());
        }
        let path = route.template().as_str().to_string();

        let mut item = self.document.paths.get(&path).cloned().unwrap_or_default();
        if item.slot_mut(method).is_none() {
            return Err(DocsError::UnknownMethod {
                method: method.to_string(),
            });
        }

        let Some(op) = OperationAssembler::new(&mut self.registry).assemble(route)? else {
            return Ok(());
        };
        if let Some(slot) = item.slot_mut(method) {
            *slot = Some(op);
        }
        self.document.paths.insert(path, item);

        for (name, schema) in self.registry.definitions() {
            if !self.document.definitions.contains_key(name) {
                self.document
                    .definitions
                    .insert(name.to_string(), schema.clone());
            }
        }
        Ok(())
    }

    /// Documents every route and finishes the document.
    pub fn build(&mut self, routes: &[RouteDefinition]) -> DocsResult<&Object> {
        for route in routes {
            self.process_route(route)?;
        }
        self.document.finish()?;
        Ok(&self.document)
    }
}

impl fmt::Debug for SwaggerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwaggerPlugin")
            .field("endpoint", &self.endpoint)
            .field("paths", &self.document.paths.len())
            .field("definitions", &self.document.definitions.len())
            .finish()
    }
}

impl HandlersScannerPlugin for SwaggerPlugin {
    fn name(&self) -> &str {
        "swagger"
    }

    fn handlers_scan(
        &mut self,
        registrar: &mut dyn RouteRegistrar,
        routes: &[RouteDefinition],
    ) -> anyhow::Result<()> {
        self.build(routes)?;
        let body = Bytes::from(serde_json::to_vec(&self.document)?);
        info!(
            endpoint = %self.endpoint,
            paths = self.document.paths.len(),
            definitions = self.document.definitions.len(),
            "swagger document built"
        );

        let handler = into_handler(move |w: ResponseWriter| {
            w.write_json_bytes(StatusCode::OK, &body);
        });
        registrar.register_route(RouteDefinition::new(
            "GET",
            PathTemplate::parse(&self.endpoint)?,
            Arc::new(BasicContainer::from_boxed(handler)),
        ));
        Ok(())
    }
}

/// A handler plus a hand-written operation that seeds its documentation.
///
/// ```rust
/// use archytas_core::{HandlerContainer, HttpError};
/// use archytas_docs::HandlerInfo;
///
/// let info = HandlerInfo::new(|| -> Result<(), HttpError> { Ok(()) })
///     .summary("Delete everything")
///     .tag("admin");
/// assert_eq!(info.operation().tags, ["admin"]);
/// assert!(info.value(archytas_docs::OPERATION_KEY).is_some());
/// ```
pub struct HandlerInfo {
    handler: BoxedHandler,
    operation: Operation,
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl HandlerInfo {
    /// Wraps a handler with an empty operation.
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self::from_boxed(into_handler(handler))
    }

    /// Wraps an already erased handler.
    #[must_use]
    pub fn from_boxed(handler: BoxedHandler) -> Self {
        Self {
            handler,
            operation: Operation::default(),
            values: HashMap::new(),
        }
    }

    /// Replaces the seed operation.
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.operation.description = Some(description.into());
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.operation.summary = Some(summary.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.operation.tags.push(tag.into());
        self
    }

    /// Sets the operation id.
    #[must_use]
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation.operation_id = Some(id.into());
        self
    }

    /// Declares a response. Its schema is filled from the handler's payload.
    #[must_use]
    pub fn response(mut self, status: impl Into<String>, description: impl Into<String>) -> Self {
        self.operation
            .responses
            .insert(status.into(), Response::new(description));
        self
    }

    /// Marks the operation deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.operation.deprecated = true;
        self
    }

    /// Stores extra metadata for other plugins.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.values.insert(key.into(), Arc::new(value));
        self
    }

    /// The seed operation.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }
}

impl HandlerContainer for HandlerInfo {
    fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    fn value(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        if key == OPERATION_KEY {
            return Some(&self.operation);
        }
        self.values.get(key).map(|v| v.as_ref())
    }
}

impl fmt::Debug for HandlerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInfo")
            .field("operation", &self.operation)
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
