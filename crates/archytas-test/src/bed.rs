//! A bench for exercising one middleware against one handler.

use std::sync::Arc;

use archytas_core::{
    into_handler, BoxedHandler, ChainResult, Exchange, Handler, ResponseWriter,
};
use archytas_middleware::{BoxedMiddleware, Bubble, Middleware};
use archytas_router::Params;
use http::Method;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// Runs a middleware under test, followed by any extra middleware, in front
/// of a handler.
///
/// The request defaults to `GET /` with an empty body.
///
/// ```
/// use archytas_core::Context;
/// use archytas_middleware::ContextBinder;
/// use archytas_test::TestBed;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let outcome = TestBed::new(ContextBinder, |_c: Context| ()).run().await.unwrap();
/// assert!(outcome.result.is_ok());
/// assert!(outcome.invoked);
/// # });
/// ```
pub struct TestBed {
    chain: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
    request: TestRequestBuilder,
    path_params: Params,
    debug: bool,
}

/// What one run of a [`TestBed`] produced.
#[derive(Debug)]
pub struct TestOutcome {
    /// What the chain returned to its caller.
    pub result: ChainResult,
    /// Everything written to the response writer.
    pub response: TestResponse,
    /// Whether the handler was invoked.
    pub invoked: bool,
    /// Number of captured handler returns.
    pub returns: usize,
}

impl TestBed {
    /// Creates a bed for `middleware` in front of `handler`.
    pub fn new<M, H, Args>(middleware: M, handler: H) -> Self
    where
        M: Middleware,
        H: Handler<Args>,
        Args: 'static,
    {
        Self::from_boxed(Arc::new(middleware), into_handler(handler))
    }

    /// Creates a bed from shared parts.
    #[must_use]
    pub fn from_boxed(middleware: BoxedMiddleware, handler: BoxedHandler) -> Self {
        Self {
            chain: vec![middleware],
            handler,
            request: TestRequestBuilder::new(Method::GET, "/"),
            path_params: Params::new(),
            debug: false,
        }
    }

    /// Appends a middleware after the one under test.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.chain.push(Arc::new(middleware));
        self
    }

    /// Replaces the request.
    #[must_use]
    pub fn request(mut self, request: TestRequestBuilder) -> Self {
        self.request = request;
        self
    }

    /// Adds a path parameter, as a router would after matching.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Sets debug mode on the exchange.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builds a fresh bubble and returns it with its writer.
    ///
    /// Drive it with [`Bubble::next`] to inspect slots and returns directly.
    pub fn bubble(&self) -> Result<(Bubble, ResponseWriter), TestError> {
        let request = self.request.clone().build()?;
        let mut exchange = Exchange::new(request).with_debug(self.debug);
        if !self.path_params.is_empty() {
            exchange = exchange.with_path_params(self.path_params.clone());
        }
        let writer = exchange.writer().clone();
        let chain: Arc<[BoxedMiddleware]> = self.chain.clone().into();
        Ok((
            Bubble::new(exchange, Arc::clone(&self.handler), chain),
            writer,
        ))
    }

    /// Runs the chain once.
    pub async fn run(&self) -> Result<TestOutcome, TestError> {
        let (mut bubble, writer) = self.bubble()?;
        let result = bubble.next().await;
        let returns = bubble.returns().len();
        Ok(TestOutcome {
            result,
            response: TestResponse::from_writer(&writer),
            invoked: bubble.is_invoked(),
            returns,
        })
    }
}

impl std::fmt::Debug for TestBed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestBed")
            .field(
                "chain",
                &self.chain.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("request", &self.request)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
