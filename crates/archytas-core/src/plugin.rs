//! The handler-scanner plugin seam.
//!
//! Plugins run once, after all routes are registered and before the mux starts
//! serving. They see every route definition and may register routes of their
//! own, such as a document endpoint.

use crate::route::RouteDefinition;

/// Accepts routes registered by plugins.
pub trait RouteRegistrar {
    /// Registers a route.
    fn register_route(&mut self, route: RouteDefinition);
}

impl RouteRegistrar for Vec<RouteDefinition> {
    fn register_route(&mut self, route: RouteDefinition) {
        self.push(route);
    }
}

/// A plugin that inspects all handlers once at startup.
pub trait HandlersScannerPlugin: Send + Sync {
    /// Plugin name, for logs.
    fn name(&self) -> &str;

    /// Scans `routes`. Failing aborts startup.
    fn handlers_scan(
        &mut self,
        registrar: &mut dyn RouteRegistrar,
        routes: &[RouteDefinition],
    ) -> anyhow::Result<()>;
}
