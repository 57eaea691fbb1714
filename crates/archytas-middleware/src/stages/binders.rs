//! Ambient-argument binders.
//!
//! These stages fill every slot whose declared type is one of the ambient
//! objects. A slot that an earlier middleware already bound is left alone.

use archytas_core::{ArgKind, BoxFuture, ChainResult};
use tracing::trace;

use crate::bubble::Bubble;
use crate::middleware::Middleware;

/// Binds `Arc<Request>` and [`ResponseWriter`] parameters.
///
/// [`ResponseWriter`]: archytas_core::ResponseWriter
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRwBinder;

impl Middleware for HttpRwBinder {
    fn name(&self) -> &'static str {
        "http_rw_binder"
    }

    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
        Box::pin(async move {
            for index in 0..bubble.argument_types().len() {
                match bubble.argument_types()[index].kind {
                    ArgKind::Request => {
                        let request = bubble.exchange().shared_request();
                        bubble.bind_value(index, request)?;
                        trace!(index, "bound request");
                    }
                    ArgKind::ResponseWriter => {
                        let writer = bubble.writer().clone();
                        bubble.bind_value(index, writer)?;
                        trace!(index, "bound response writer");
                    }
                    _ => {}
                }
            }
            bubble.next().await
        })
    }
}

/// Binds [`Context`] parameters with the call context.
///
/// [`Context`]: archytas_core::Context
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBinder;

impl Middleware for ContextBinder {
    fn name(&self) -> &'static str {
        "context_binder"
    }

    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
        Box::pin(async move {
            for index in 0..bubble.argument_types().len() {
                if bubble.argument_types()[index].kind == ArgKind::Context {
                    let context = bubble.context().clone();
                    bubble.bind_value(index, context)?;
                    trace!(index, "bound context");
                }
            }
            bubble.next().await
        })
    }
}
