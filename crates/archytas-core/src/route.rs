//! Route definitions.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use archytas_router::PathTemplate;

use crate::handler::{into_handler, BoxedHandler, Handler, Signature};

/// Wildcard method matching every request method.
pub const ANY_METHOD: &str = "*";

/// Holds a route's handler plus per-route metadata.
///
/// The metadata slot lets plugins attach documents to a route, for example a
/// hand-written operation description.
pub trait HandlerContainer: Send + Sync + 'static {
    /// The handler.
    fn handler(&self) -> &BoxedHandler;

    /// Metadata stored under `key`.
    fn value(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        let _ = key;
        None
    }
}

/// A container with a handler and no metadata.
#[derive(Clone)]
pub struct BasicContainer {
    handler: BoxedHandler,
}

impl BasicContainer {
    /// Wraps a handler.
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self {
            handler: into_handler(handler),
        }
    }

    /// Wraps an already erased handler.
    #[must_use]
    pub fn from_boxed(handler: BoxedHandler) -> Self {
        Self { handler }
    }
}

impl HandlerContainer for BasicContainer {
    fn handler(&self) -> &BoxedHandler {
        &self.handler
    }
}

/// A registered route. Immutable once built.
#[derive(Clone)]
pub struct RouteDefinition {
    method: String,
    template: PathTemplate,
    container: Arc<dyn HandlerContainer>,
}

impl RouteDefinition {
    /// Creates a route. The method is upper-cased.
    pub fn new(
        method: &str,
        template: PathTemplate,
        container: Arc<dyn HandlerContainer>,
    ) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            template,
            container,
        }
    }

    /// Upper-case method, or `*`.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Handler container.
    #[must_use]
    pub fn container(&self) -> &Arc<dyn HandlerContainer> {
        &self.container
    }

    /// Handler signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        self.container.handler().signature()
    }

    /// Returns true if this route serves `method`.
    #[must_use]
    pub fn matches_method(&self, method: &str) -> bool {
        self.method == ANY_METHOD || self.method.eq_ignore_ascii_case(method)
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .field("params", &self.signature().params.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResponseWriter;

    fn route(method: &str) -> RouteDefinition {
        RouteDefinition::new(
            method,
            PathTemplate::parse("/api/todo/{id}").unwrap(),
            Arc::new(BasicContainer::new(|_w: ResponseWriter| ())),
        )
    }

    #[test]
    fn test_method_is_uppercased() {
        let route = route("post");
        assert_eq!(route.method(), "POST");
        assert!(route.matches_method("POST"));
        assert!(!route.matches_method("GET"));
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let route = route("*");
        assert!(route.matches_method("GET"));
        assert!(route.matches_method("DELETE"));
    }

    #[test]
    fn test_basic_container_has_no_metadata() {
        let route = route("GET");
        assert!(route.container().value("anything").is_none());
        assert_eq!(route.signature().params.len(), 1);
    }
}
