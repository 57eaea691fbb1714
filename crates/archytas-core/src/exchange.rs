//! The ambient part of one call.

use std::sync::Arc;

use archytas_router::Params;

use crate::context::{Context, RequestId, PATH_PARAMETERS_KEY};
use crate::error::ChainError;
use crate::types::Request;
use crate::writer::ResponseWriter;

/// Request, response sink, context and debug flag of one call.
///
/// Cloning is cheap: the request is shared and the writer clones share one
/// buffer.
#[derive(Debug, Clone)]
pub struct Exchange {
    request: Arc<Request>,
    writer: ResponseWriter,
    context: Context,
    debug: bool,
    request_id: RequestId,
}

impl Exchange {
    /// Creates an exchange with a fresh writer and a background context.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self::from_shared(Arc::new(request))
    }

    /// Creates an exchange around an already shared request.
    #[must_use]
    pub fn from_shared(request: Arc<Request>) -> Self {
        Self {
            request,
            writer: ResponseWriter::new(),
            context: Context::background(),
            debug: false,
            request_id: RequestId::new(),
        }
    }

    /// Replaces the context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Replaces the writer.
    #[must_use]
    pub fn with_writer(mut self, writer: ResponseWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Sets debug mode, which pretty-prints JSON responses.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Stores path parameters in the context under [`PATH_PARAMETERS_KEY`].
    #[must_use]
    pub fn with_path_params(mut self, params: Params) -> Self {
        self.context = self.context.with_value(PATH_PARAMETERS_KEY, params);
        self
    }

    /// The inbound request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The inbound request as a shared handle.
    #[must_use]
    pub fn shared_request(&self) -> Arc<Request> {
        Arc::clone(&self.request)
    }

    /// The response sink.
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// The call context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Replaces the call context in place.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Whether responses are pretty-printed.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Identifier of this call.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Path parameters, if the router stored them as [`Params`].
    #[must_use]
    pub fn path_params(&self) -> Option<&Params> {
        self.context.value_as::<Params>(PATH_PARAMETERS_KEY)
    }
}

/// A success value that writes its own response.
///
/// When the first payload returned by a handler is a response modifier, the
/// response mapper hands the whole response over to it and never serializes
/// the value itself. Derive `Reflect` with `#[api(response_modifier)]` to
/// connect the two:
///
/// ```rust
/// use archytas_core::{ChainError, Exchange, Reflect, ResponseModifier};
/// use http::StatusCode;
///
/// #[derive(serde::Serialize, Reflect)]
/// #[api(response_modifier)]
/// struct Created {
///     id: i64,
/// }
///
/// impl ResponseModifier for Created {
///     fn handle(&self, exchange: &Exchange) -> Result<(), ChainError> {
///         exchange
///             .writer()
///             .write_json(StatusCode::CREATED, &serde_json::json!({"id": self.id}), false)
///             .map_err(|e| ChainError::new(archytas_core::HttpError::internal(e.to_string())))
///     }
/// }
/// ```
pub trait ResponseModifier: Send + Sync {
    /// Writes the response.
    fn handle(&self, exchange: &Exchange) -> Result<(), ChainError>;
}
