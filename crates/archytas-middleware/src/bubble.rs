//! The per-call execution context.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use archytas_core::{
    ArgDescriptor, ArgKind, BoundValue, BoxFuture, BoxedHandler, ChainError, ChainResult, Context,
    DispatchError, Exchange, Request, ResponseWriter, ReturnValue,
};
use tracing::{debug, trace};

use crate::middleware::BoxedMiddleware;

/// Everything one call carries through the chain.
///
/// A bubble is created per request with one empty slot per handler
/// parameter. Middleware bind slots (the first bind wins), then the last
/// [`Bubble::next`] invokes the handler and captures its returns.
pub struct Bubble {
    exchange: Exchange,
    argument_types: Vec<ArgDescriptor>,
    arguments: Vec<Option<BoundValue>>,
    returns: Vec<ReturnValue>,
    handler: BoxedHandler,
    chain: Arc<[BoxedMiddleware]>,
    position: usize,
    invoked: bool,
}

impl Bubble {
    /// Creates a bubble for `handler` that will run `chain` first.
    #[must_use]
    pub fn new(exchange: Exchange, handler: BoxedHandler, chain: Arc<[BoxedMiddleware]>) -> Self {
        let argument_types = handler.signature().params.clone();
        let arguments = argument_types.iter().map(|_| None).collect();
        Self {
            exchange,
            argument_types,
            arguments,
            returns: Vec::new(),
            handler,
            chain,
            position: 0,
            invoked: false,
        }
    }

    /// Runs the next middleware, or the handler once the chain is exhausted.
    ///
    /// The future resolves to the downstream result. A handler invocation
    /// resolves to the last non-nil error the handler returned, if any; the
    /// captured returns stay available through [`Bubble::returns`] either way.
    pub fn next(&mut self) -> BoxFuture<'_, ChainResult> {
        Box::pin(async move {
            if let Some(middleware) = self.chain.get(self.position).cloned() {
                self.position += 1;
                trace!(middleware = middleware.name(), position = self.position, "entering middleware");
                middleware.process(self).await
            } else {
                self.invoke()
            }
        })
    }

    fn invoke(&mut self) -> ChainResult {
        if self.invoked {
            return Err(DispatchError::AlreadyInvoked.into());
        }
        self.invoked = true;

        let slots = self.argument_types.len();
        let arguments = std::mem::replace(
            &mut self.arguments,
            (0..slots).map(|_| None).collect(),
        );
        debug!(arguments = slots, "invoking handler");
        self.returns = self.handler.call(arguments)?;

        match self.returns.iter().rev().find_map(ReturnValue::error) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Binds `value` into slot `index`.
    ///
    /// Returns `Ok(false)` without touching the slot when it is already
    /// bound. Fails when the index is out of range or the value does not fit
    /// the declared parameter type.
    pub fn bind(&mut self, index: usize, value: BoundValue) -> Result<bool, ChainError> {
        let Some(descriptor) = self.argument_types.get(index) else {
            return Err(DispatchError::ArityMismatch {
                expected: self.argument_types.len(),
                actual: index + 1,
            }
            .into());
        };
        if !descriptor.accepts(&*value) {
            return Err(DispatchError::ArgumentTypeMismatch {
                index,
                expected: descriptor.type_name,
            }
            .into());
        }
        let slot = &mut self.arguments[index];
        if slot.is_some() {
            trace!(index, "slot already bound");
            return Ok(false);
        }
        *slot = Some(value);
        Ok(true)
    }

    /// Binds a typed value into slot `index`. See [`Bubble::bind`].
    pub fn bind_value<T: Any + Send + Sync>(
        &mut self,
        index: usize,
        value: T,
    ) -> Result<bool, ChainError> {
        self.bind(index, Box::new(value))
    }

    /// Declared parameter descriptors, in handler order.
    #[must_use]
    pub fn argument_types(&self) -> &[ArgDescriptor] {
        &self.argument_types
    }

    /// Argument slots. Always as long as [`Bubble::argument_types`].
    #[must_use]
    pub fn arguments(&self) -> &[Option<BoundValue>] {
        &self.arguments
    }

    /// The value bound into slot `index`.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&(dyn Any + Send + Sync)> {
        self.arguments.get(index)?.as_deref()
    }

    /// Returns true if slot `index` holds a value.
    #[must_use]
    pub fn is_bound(&self, index: usize) -> bool {
        self.argument(index).is_some()
    }

    /// Position of the first unbound slot of `kind`.
    #[must_use]
    pub fn first_unbound(&self, kind: ArgKind) -> Option<usize> {
        self.argument_types
            .iter()
            .zip(&self.arguments)
            .position(|(descriptor, slot)| descriptor.kind == kind && slot.is_none())
    }

    /// Captured handler returns, in declaration order. Empty until the
    /// handler ran.
    #[must_use]
    pub fn returns(&self) -> &[ReturnValue] {
        &self.returns
    }

    /// Returns true once the handler was invoked.
    #[must_use]
    pub fn is_invoked(&self) -> bool {
        self.invoked
    }

    /// Number of middleware already entered.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The ambient part of the call.
    #[must_use]
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Mutable access to the ambient part of the call.
    pub fn exchange_mut(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    /// The request.
    #[must_use]
    pub fn request(&self) -> &Request {
        self.exchange.request()
    }

    /// The response writer.
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        self.exchange.writer()
    }

    /// The call context.
    #[must_use]
    pub fn context(&self) -> &Context {
        self.exchange.context()
    }

    /// Replaces the call context, for example to attach a deadline.
    pub fn set_context(&mut self, context: Context) {
        self.exchange.set_context(context);
    }

    /// Debug mode: JSON responses are pretty-printed.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.exchange.debug()
    }
}

impl fmt::Debug for Bubble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<bool> = self.arguments.iter().map(Option::is_some).collect();
        f.debug_struct("Bubble")
            .field("request_id", &self.exchange.request_id())
            .field("argument_types", &self.argument_types)
            .field("bound", &bound)
            .field("returns", &self.returns)
            .field("position", &self.position)
            .field("chain", &self.chain.len())
            .field("invoked", &self.invoked)
            .finish()
    }
}
