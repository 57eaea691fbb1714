//! Error capabilities shared by handlers, binders and the response mapper.
//!
//! Every error that flows through the middleware chain is a [`ChainError`],
//! a cheap, cloneable handle to something implementing [`HandlerError`].
//! Errors that know how they should be rendered implement
//! [`HttpErrorResponse`]; everything else is rendered as a generic
//! `{"code":500,"message":...}` envelope.
//!
//! | Type | Status | Body |
//! |------|--------|------|
//! | [`HttpError`] | its own code | `{"code":..,"message":..}` |
//! | any [`HttpErrorResponse`] | `status_code()` | `error_message()` |
//! | anything else | 500 | `{"code":500,"message":"<display>"}` |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::reflect::{Reflect, TypeInfoFn};

/// An error that knows its HTTP status and response body.
pub trait HttpErrorResponse: fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Status code of the error response.
    fn status_code(&self) -> StatusCode;

    /// Body of the error response.
    ///
    /// Returning [`Value::Null`] renders the default `{"code","message"}`
    /// envelope instead.
    fn error_message(&self) -> Value;
}

impl HttpErrorResponse for Box<dyn HttpErrorResponse> {
    fn status_code(&self) -> StatusCode {
        (**self).status_code()
    }

    fn error_message(&self) -> Value {
        (**self).error_message()
    }
}

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny {
    /// Returns `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// How a declared error type is described in a schema document.
#[derive(Debug, Clone, Copy)]
pub enum ErrorClass {
    /// An opaque error with no documented shape.
    Generic,
    /// An error implementing [`HttpErrorResponse`], documented by its producer.
    HttpCapability,
    /// A concrete error type with its own schema.
    Concrete(TypeInfoFn),
}

impl ErrorClass {
    /// Class of a concrete, reflected error type.
    #[must_use]
    pub fn of<T: Reflect>() -> Self {
        Self::Concrete(T::type_info)
    }
}

/// Errors a handler or middleware may return.
///
/// Anything implementing [`HttpErrorResponse`] is a `HandlerError`
/// automatically. Other error types opt in with an empty impl, or override
/// [`HandlerError::error_class`] to have their shape documented:
///
/// ```rust
/// use archytas_core::{ErrorClass, HandlerError, Reflect};
///
/// #[derive(Debug, serde::Serialize, Reflect)]
/// struct Conflict {
///     reason: String,
/// }
///
/// impl std::fmt::Display for Conflict {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "conflict: {}", self.reason)
///     }
/// }
///
/// impl HandlerError for Conflict {
///     fn error_class() -> ErrorClass {
///         ErrorClass::of::<Self>()
///     }
/// }
/// ```
pub trait HandlerError: AsAny + fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Returns the HTTP rendering of this error, if it has one.
    fn as_http_error(&self) -> Option<&dyn HttpErrorResponse> {
        None
    }

    /// Returns how the type is described in a schema document.
    fn error_class() -> ErrorClass
    where
        Self: Sized,
    {
        ErrorClass::Generic
    }
}

impl<T: HttpErrorResponse> HandlerError for T {
    fn as_http_error(&self) -> Option<&dyn HttpErrorResponse> {
        Some(self)
    }

    fn error_class() -> ErrorClass {
        ErrorClass::HttpCapability
    }
}

impl HandlerError for anyhow::Error {}

impl HandlerError for Box<dyn std::error::Error + Send + Sync> {}

impl HandlerError for std::io::Error {}

/// A type-erased error travelling through the middleware chain.
#[derive(Clone)]
pub struct ChainError {
    inner: Arc<dyn HandlerError>,
}

impl ChainError {
    /// Wraps an error.
    pub fn new<E: HandlerError>(error: E) -> Self {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn inner(&self) -> &dyn HandlerError {
        &*self.inner
    }

    /// Returns the HTTP rendering of the wrapped error, if any.
    #[must_use]
    pub fn http_error(&self) -> Option<&dyn HttpErrorResponse> {
        self.inner.as_http_error()
    }

    /// Status code the error renders with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.http_error()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, |e| e.status_code())
    }

    /// Body the error renders with.
    ///
    /// Uses the HTTP rendering when present and non-null, otherwise the
    /// `{"code","message"}` envelope built from the display text.
    #[must_use]
    pub fn body(&self) -> Value {
        let message = self
            .http_error()
            .map(|e| e.error_message())
            .unwrap_or(Value::Null);
        if message.is_null() {
            json!({
                "code": self.status_code().as_u16(),
                "message": self.inner.to_string(),
            })
        } else {
            message
        }
    }

    /// Returns true if the wrapped error is an `E`.
    #[must_use]
    pub fn is<E: HandlerError>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Downcasts the wrapped error.
    #[must_use]
    pub fn downcast_ref<E: HandlerError>(&self) -> Option<&E> {
        let inner: &dyn HandlerError = &*self.inner;
        inner.as_any().downcast_ref::<E>()
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl std::error::Error for ChainError {}

impl<E: HandlerError> From<E> for ChainError {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

/// Result of a middleware or of the chain as a whole.
pub type ChainResult = Result<(), ChainError>;

/// A plain HTTP error: a status code and a JSON message.
///
/// ```rust
/// use archytas_core::{HttpError, HttpErrorResponse};
/// use http::StatusCode;
///
/// let err = HttpError::bad_request("offset must be positive");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(
///     err.error_message(),
///     serde_json::json!({"code": 400, "message": "offset must be positive"}),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpError {
    /// HTTP status code.
    pub code: u16,
    /// Message, usually a string.
    pub message: Value,
}

impl HttpError {
    /// Creates an error with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<Value>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    /// Creates a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// Creates a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Value::String(message) => write!(f, "status code {}: {}", self.code, message),
            other => write!(f, "status code {}: {}", self.code, other),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpErrorResponse for HttpError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_message(&self) -> Value {
        json!({ "code": self.code, "message": self.message })
    }
}

/// Failures of the dispatcher itself.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler argument was never bound by any middleware.
    #[error("argument {index} ({type_name}) was not bound by any middleware")]
    UnboundArgument {
        /// Position of the argument.
        index: usize,
        /// Declared type of the argument.
        type_name: &'static str,
    },

    /// The number of bound slots does not match the handler arity.
    #[error("handler expects {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Declared arity.
        expected: usize,
        /// Slots supplied.
        actual: usize,
    },

    /// A slot holds a value of the wrong type.
    #[error("argument {index} holds a value that is not a {expected}")]
    ArgumentTypeMismatch {
        /// Position of the argument.
        index: usize,
        /// Declared type of the argument.
        expected: &'static str,
    },

    /// The handler was already invoked for this call.
    #[error("handler was already invoked for this call")]
    AlreadyInvoked,
}

impl HandlerError for DispatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("strange error")]
    struct StrangeError;

    impl HandlerError for StrangeError {}

    #[derive(Debug)]
    struct CustomError;

    impl fmt::Display for CustomError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("custom error")
        }
    }

    impl HttpErrorResponse for CustomError {
        fn status_code(&self) -> StatusCode {
            StatusCode::BAD_REQUEST
        }

        fn error_message(&self) -> Value {
            json!({"text": "Hello from custom error"})
        }
    }

    #[derive(Debug)]
    struct SilentError;

    impl fmt::Display for SilentError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("teapot")
        }
    }

    impl HttpErrorResponse for SilentError {
        fn status_code(&self) -> StatusCode {
            StatusCode::IM_A_TEAPOT
        }

        fn error_message(&self) -> Value {
            Value::Null
        }
    }

    #[test]
    fn test_generic_error_renders_500_envelope() {
        let err = ChainError::new(StrangeError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), json!({"code": 500, "message": "strange error"}));
        assert!(err.http_error().is_none());
    }

    #[test]
    fn test_http_capability_renders_its_own_body() {
        let err = ChainError::from(CustomError);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({"text": "Hello from custom error"}));
        assert!(matches!(CustomError::error_class(), ErrorClass::HttpCapability));
    }

    #[test]
    fn test_null_message_falls_back_to_envelope() {
        let err = ChainError::new(SilentError);
        assert_eq!(err.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(err.body(), json!({"code": 418, "message": "teapot"}));
    }

    #[test]
    fn test_http_error() {
        let err = HttpError::bad_request("bad");
        assert_eq!(err.to_string(), "status code 400: bad");
        let chain: ChainError = err.clone().into();
        assert_eq!(chain.body(), json!({"code": 400, "message": "bad"}));
        assert_eq!(chain.downcast_ref::<HttpError>(), Some(&err));
    }

    #[test]
    fn test_downcast_through_clone() {
        let err = ChainError::new(StrangeError);
        let cloned = err.clone();
        assert!(cloned.is::<StrangeError>());
        assert!(!cloned.is::<HttpError>());
    }

    #[test]
    fn test_anyhow_is_generic() {
        let err = ChainError::new(anyhow::anyhow!("boom"));
        assert_eq!(err.body(), json!({"code": 500, "message": "boom"}));
        assert!(matches!(
            <anyhow::Error as HandlerError>::error_class(),
            ErrorClass::Generic
        ));
    }

    #[test]
    fn test_dispatch_error_message() {
        let err = DispatchError::UnboundArgument {
            index: 1,
            type_name: "Box<Todo>",
        };
        assert_eq!(
            err.to_string(),
            "argument 1 (Box<Todo>) was not bound by any middleware"
        );
    }
}
