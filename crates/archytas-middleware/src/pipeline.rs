//! Ordered middleware chains.
//!
//! A [`Pipeline`] is the frozen, shared list of middleware every call runs
//! through, in registration order. The builder starts empty; the orthodox
//! set installs the four built-in stages in their canonical order:
//!
//! 1. **HttpRwBinder** - bind request and response writer
//! 2. **ContextBinder** - bind the call context
//! 3. **ResponseMapper** - render errors and payloads
//! 4. **RequestObjectMapper** - decode the structured request object
//!
//! Middleware added after the orthodox set run between the request-object
//! binder and the handler.

use std::sync::Arc;

use archytas_core::{BoxedHandler, ChainResult, Exchange};

use crate::bubble::Bubble;
use crate::middleware::{BoxedMiddleware, Middleware};
use crate::stages::binders::{ContextBinder, HttpRwBinder};
use crate::stages::request_object::RequestObjectMapper;
use crate::stages::response_mapper::ResponseMapper;

/// A frozen middleware chain.
///
/// Cloning is cheap; clones share the middleware list.
///
/// ```
/// use archytas_core::{into_handler, Exchange, ResponseWriter};
/// use archytas_middleware::Pipeline;
/// # use bytes::Bytes;
/// # use http_body_util::Full;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder().orthodox().build();
/// let request = http::Request::builder()
///     .uri("/hello")
///     .body(Full::new(Bytes::new()))
///     .unwrap();
/// let exchange = Exchange::new(request);
/// let writer = exchange.writer().clone();
///
/// let handler = into_handler(|w: ResponseWriter| w.write(b"hello"));
/// pipeline.run(exchange, handler).await.unwrap();
/// assert_eq!(writer.body_string(), "hello");
/// # });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[BoxedMiddleware]>,
}

impl Pipeline {
    /// Creates an empty builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Creates the bubble of one call without running it.
    #[must_use]
    pub fn bubble(&self, exchange: Exchange, handler: BoxedHandler) -> Bubble {
        Bubble::new(exchange, handler, Arc::clone(&self.stages))
    }

    /// Runs one call through the chain and the handler.
    pub async fn run(&self, exchange: Exchange, handler: BoxedHandler) -> ChainResult {
        let mut bubble = self.bubble(exchange, handler);
        bubble.next().await
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns true for a chain without middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    #[must_use]
    pub fn with_boxed(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Appends the orthodox stages with a default request-object binder.
    #[must_use]
    pub fn orthodox(self) -> Self {
        self.orthodox_with(RequestObjectMapper::new())
    }

    /// Appends the orthodox stages using `request_mapper` as the
    /// request-object binder.
    #[must_use]
    pub fn orthodox_with(self, request_mapper: RequestObjectMapper) -> Self {
        self.with(HttpRwBinder)
            .with(ContextBinder)
            .with(ResponseMapper)
            .with(request_mapper)
    }

    /// Number of middleware added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if nothing was added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Freezes the chain.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnMiddleware;
    use archytas_core::{into_handler, Context, ResponseWriter};
    use bytes::Bytes;
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn exchange() -> Exchange {
        Exchange::new(
            http::Request::builder()
                .uri("/")
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
    }

    #[test]
    fn test_orthodox_order() {
        let pipeline = Pipeline::builder().orthodox().build();
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "http_rw_binder",
                "context_binder",
                "response_mapper",
                "request_object_mapper"
            ]
        );
        assert_eq!(pipeline.stage_count(), 4);
    }

    #[test]
    fn test_default_pipeline_is_empty() {
        assert!(Pipeline::default().is_empty());
        assert!(PipelineBuilder::new().is_empty());
    }

    #[tokio::test]
    async fn test_custom_middleware_runs_after_orthodox_stages() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);

        let pipeline = Pipeline::builder()
            .orthodox()
            .with(FnMiddleware::new("count", |b| {
                Box::pin(async move {
                    // Binders already ran.
                    assert!(b.is_bound(0));
                    assert!(b.is_bound(1));
                    SEEN.fetch_add(1, Ordering::SeqCst);
                    b.next().await
                })
            }))
            .build();

        let exchange = exchange();
        let writer = exchange.writer().clone();
        let handler = into_handler(|w: ResponseWriter, _c: Context| w.write(b"ok"));
        pipeline.run(exchange, handler).await.unwrap();

        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
        assert_eq!(writer.body_string(), "ok");
    }

    #[tokio::test]
    async fn test_pipeline_is_reusable() {
        let pipeline = Pipeline::builder().orthodox().build();
        for _ in 0..3 {
            let exchange = exchange();
            let writer = exchange.writer().clone();
            let handler = into_handler(|| -> Option<Vec<u8>> { None });
            pipeline.run(exchange, handler).await.unwrap();
            assert_eq!(writer.body_string(), "[]");
        }
    }
}
