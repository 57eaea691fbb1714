//! Route and middleware registration.
//!
//! A [`ServeMux`] collects middleware, routes and scanner plugins. Nothing
//! runs until [`ServeMux::prepare`], which hands every plugin the full route
//! table, freezes the middleware chain and returns a [`MuxService`].

use std::fmt;
use std::sync::Arc;

use archytas_config::ArchytasConfig;
use archytas_core::{
    BasicContainer, Handler, HandlerContainer, HandlersScannerPlugin, RouteDefinition, ANY_METHOD,
};
use archytas_docs::{Info, Object, SwaggerOptions, SwaggerPlugin};
use archytas_middleware::{BoxedMiddleware, Middleware, PipelineBuilder, RequestObjectMapper};
use archytas_router::PathTemplate;
use http::Method;
use tracing::info;

use crate::error::{MuxError, MuxResult};
use crate::service::MuxService;

/// Registry of routes, middleware and plugins.
///
/// ```
/// use archytas::ServeMux;
/// use archytas::core::ResponseWriter;
/// use http::StatusCode;
///
/// let mut mux = ServeMux::new();
/// mux.orthodox()
///     .handle("GET", "/api/ping", |w: ResponseWriter| {
///         w.write_text(StatusCode::OK, "pong");
///     })
///     .unwrap();
///
/// let service = mux.prepare().unwrap();
/// assert_eq!(service.routes().len(), 1);
/// ```
#[derive(Default)]
pub struct ServeMux {
    routes: Vec<RouteDefinition>,
    pipeline: PipelineBuilder,
    plugins: Vec<Box<dyn HandlersScannerPlugin>>,
    debug: bool,
}

impl ServeMux {
    /// Creates an empty mux with no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mux from validated configuration.
    ///
    /// Installs the orthodox middleware with the configured body strictness
    /// and, when docs are enabled, a [`SwaggerPlugin`] seeded from the docs
    /// section.
    pub fn from_config(config: &ArchytasConfig) -> MuxResult<Self> {
        config.validate()?;

        let mut mux = Self::new();
        mux.debug(config.mux.debug);
        mux.orthodox_with(
            RequestObjectMapper::new().strict_bodies(config.mux.strict_json_bodies),
        );

        if config.docs.enabled {
            let docs = &config.docs;
            let mut info = Info::new(&docs.title, &docs.version);
            info.description = docs.description.clone();
            let object = Object {
                info: Some(info),
                base_path: docs.base_path.clone(),
                ..Object::default()
            };
            mux.plugin(SwaggerPlugin::with_options(SwaggerOptions {
                object,
                endpoint: docs.endpoint.clone(),
                ..SwaggerOptions::default()
            }));
        }

        Ok(mux)
    }

    /// Sets debug mode for every exchange.
    pub fn debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Appends a middleware. Middleware run in registration order.
    pub fn middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.pipeline = std::mem::take(&mut self.pipeline).with(middleware);
        self
    }

    /// Appends an already shared middleware.
    pub fn middleware_boxed(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.pipeline = std::mem::take(&mut self.pipeline).with_boxed(middleware);
        self
    }

    /// Appends the orthodox stages: request/response binder, context binder,
    /// response mapper and request-object binder.
    pub fn orthodox(&mut self) -> &mut Self {
        self.orthodox_with(RequestObjectMapper::new())
    }

    /// Appends the orthodox stages with a custom request-object binder.
    pub fn orthodox_with(&mut self, request_mapper: RequestObjectMapper) -> &mut Self {
        self.pipeline = std::mem::take(&mut self.pipeline).orthodox_with(request_mapper);
        self
    }

    /// Registers `handler` for `method` (or `*`) on `path`.
    pub fn handle<H, Args>(&mut self, method: &str, path: &str, handler: H) -> MuxResult<&mut Self>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.handle_container(method, path, BasicContainer::new(handler))
    }

    /// Registers a handler container, for handlers carrying metadata such as
    /// [`HandlerInfo`](archytas_docs::HandlerInfo).
    pub fn handle_container<C: HandlerContainer>(
        &mut self,
        method: &str,
        path: &str,
        container: C,
    ) -> MuxResult<&mut Self> {
        let method = normalize_method(method)?;
        let template = PathTemplate::parse(path)?;
        info!(method = %method, path = %template.as_str(), "route registered");
        self.routes
            .push(RouteDefinition::new(&method, template, Arc::new(container)));
        Ok(self)
    }

    /// Adds a handler-scanner plugin, run by [`ServeMux::prepare`].
    pub fn plugin<P: HandlersScannerPlugin + 'static>(&mut self, plugin: P) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Routes registered so far.
    #[must_use]
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Runs every plugin over the route table and freezes the mux.
    ///
    /// Plugins run in registration order; each sees the routes registered
    /// by the plugins before it. A failing plugin aborts startup.
    pub fn prepare(mut self) -> MuxResult<MuxService> {
        for plugin in &mut self.plugins {
            let mut added = Vec::new();
            plugin
                .handlers_scan(&mut added, &self.routes)
                .map_err(|e| MuxError::Plugin {
                    name: plugin.name().to_string(),
                    message: format!("{e:#}"),
                })?;
            info!(plugin = plugin.name(), added = added.len(), "plugin scan finished");
            self.routes.extend(added);
        }

        let pipeline = self.pipeline.build();
        info!(
            routes = self.routes.len(),
            stages = ?pipeline.stage_names(),
            "mux prepared"
        );
        Ok(MuxService::new(self.routes, pipeline, self.debug))
    }
}

impl fmt::Debug for ServeMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeMux")
            .field("routes", &self.routes)
            .field("stages", &self.pipeline.len())
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("debug", &self.debug)
            .finish()
    }
}

fn normalize_method(method: &str) -> MuxResult<String> {
    if method == ANY_METHOD {
        return Ok(ANY_METHOD.to_string());
    }
    let upper = method.to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes())
        .map(|m| m.as_str().to_string())
        .map_err(|_| MuxError::InvalidMethod(method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use archytas_core::ResponseWriter;

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method("get").unwrap(), "GET");
        assert_eq!(normalize_method("*").unwrap(), "*");
        assert_eq!(normalize_method("PURGE").unwrap(), "PURGE");
        assert!(matches!(
            normalize_method("GE T"),
            Err(MuxError::InvalidMethod(_))
        ));
        assert!(normalize_method("").is_err());
    }

    #[test]
    fn test_bad_template_is_rejected() {
        let mut mux = ServeMux::new();
        let err = mux
            .handle("GET", "api/todo", |_w: ResponseWriter| ())
            .unwrap_err();
        assert!(matches!(err, MuxError::Template(_)));
        assert!(mux.routes().is_empty());
    }

    #[test]
    fn test_from_config_installs_orthodox_and_docs() {
        let mux = ServeMux::from_config(&ArchytasConfig::default()).unwrap();
        assert_eq!(mux.pipeline.len(), 4);
        assert_eq!(mux.plugins.len(), 1);
        assert_eq!(mux.plugins[0].name(), "swagger");

        let mut config = ArchytasConfig::default();
        config.docs.enabled = false;
        let mux = ServeMux::from_config(&config).unwrap();
        assert!(mux.plugins.is_empty());
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = ArchytasConfig::default();
        config.docs.endpoint = "swagger.json".to_string();
        assert!(matches!(
            ServeMux::from_config(&config),
            Err(MuxError::Config(_))
        ));
    }
}
