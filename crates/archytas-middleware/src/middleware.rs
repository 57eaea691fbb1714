//! The middleware trait.
//!
//! A middleware gets exclusive access to the [`Bubble`] for the duration of
//! its turn. It may inspect or bind argument slots, write to the response
//! and either continue with [`Bubble::next`] or return without continuing,
//! which short-circuits the rest of the chain and the handler.
//!
//! # Example
//!
//! ```
//! use archytas_core::{BoxFuture, ChainResult};
//! use archytas_middleware::{Bubble, Middleware};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
//!         Box::pin(async move {
//!             let started = std::time::Instant::now();
//!             let result = bubble.next().await;
//!             tracing::debug!(elapsed = ?started.elapsed(), "call finished");
//!             result
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use archytas_core::{BoxFuture, ChainResult};

use crate::bubble::Bubble;

/// One step of the chain.
///
/// # Invariants
///
/// - A middleware continues the chain at most once per call
/// - Errors returned by [`Bubble::next`] are either rendered or returned
pub trait Middleware: Send + Sync + 'static {
    /// Name of the middleware, used in logs and [`Pipeline::stage_names`].
    ///
    /// [`Pipeline::stage_names`]: crate::Pipeline::stage_names
    fn name(&self) -> &'static str;

    /// Runs this step.
    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult>;
}

/// Shared middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A middleware built from a closure.
///
/// ```
/// use archytas_core::HttpError;
/// use archytas_middleware::FnMiddleware;
///
/// let deny = FnMiddleware::new("deny", |_bubble| {
///     Box::pin(async { Err(HttpError::bad_request("denied").into()) })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Bubble) -> BoxFuture<'a, ChainResult> + Send + Sync + 'static,
{
    /// Wraps `func` under `name`.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Bubble) -> BoxFuture<'a, ChainResult> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
        (self.func)(bubble)
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
