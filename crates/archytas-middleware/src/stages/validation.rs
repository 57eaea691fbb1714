//! Request-object validation.
//!
//! [`RequestValidator`] runs an injected [`Validator`] over every bound
//! request object before the chain continues. The first failure stops the
//! call and is returned to the response mapper.
//!
//! [`SchemaValidator`] is the ready-made validator. It reads the `api`
//! attributes of the request object's fields:
//!
//! | Attribute | Check |
//! |-----------|-------|
//! | `required` | the value is not its zero value |
//! | `enum = "a\|b"` | non-empty values are one of the listed values |
//! | `min`, `max` | numbers lie within the inclusive bounds |
//! | `min_len`, `max_len` | string length (in characters) or element count |
//! | `pattern` | non-empty strings match the regular expression |
//!
//! Nested structs, sequences of structs and flattened members are checked
//! recursively. `in = ...` markers play no part in validation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use archytas_core::{
    ArgDescriptor, BoxFuture, ChainError, ChainResult, FieldInfo, HttpErrorResponse, Kind,
    TypeInfo,
};
use http::StatusCode;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::bubble::Bubble;
use crate::middleware::Middleware;

/// A validation failure, rendered as `{"message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    status: StatusCode,
    message: String,
}

impl ValidationError {
    /// Creates a failure with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a `400 Bad Request` failure.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl HttpErrorResponse for ValidationError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_message(&self) -> Value {
        json!({ "message": self.message })
    }
}

/// A bound request object under validation.
#[derive(Clone, Copy)]
pub struct ArgumentView<'a> {
    index: usize,
    descriptor: &'a ArgDescriptor,
    value: &'a (dyn Any + Send + Sync),
}

impl<'a> ArgumentView<'a> {
    /// Creates a view of slot `index`.
    #[must_use]
    pub fn new(
        index: usize,
        descriptor: &'a ArgDescriptor,
        value: &'a (dyn Any + Send + Sync),
    ) -> Self {
        Self {
            index,
            descriptor,
            value,
        }
    }

    /// Position of the argument.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared parameter.
    #[must_use]
    pub fn descriptor(&self) -> &'a ArgDescriptor {
        self.descriptor
    }

    /// The bound value.
    #[must_use]
    pub fn value(&self) -> &'a (dyn Any + Send + Sync) {
        self.value
    }

    /// The bound value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.value.downcast_ref::<T>()
    }

    /// Descriptor of the request object type.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeInfo> {
        self.descriptor.aggregate_type()
    }

    /// The bound value as JSON.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        self.descriptor
            .codec
            .and_then(|codec| (codec.encode)(self.value))
    }
}

impl fmt::Debug for ArgumentView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentView")
            .field("index", &self.index)
            .field("type_name", &self.descriptor.type_name)
            .finish_non_exhaustive()
    }
}

/// Checks one bound request object.
pub trait Validator: Send + Sync + 'static {
    /// Returns an error to stop the call.
    fn validate(&self, argument: &ArgumentView<'_>) -> Result<(), ChainError>;
}

impl<F> Validator for F
where
    F: Fn(&ArgumentView<'_>) -> Result<(), ChainError> + Send + Sync + 'static,
{
    fn validate(&self, argument: &ArgumentView<'_>) -> Result<(), ChainError> {
        self(argument)
    }
}

type IgnoreFn = Arc<dyn Fn(&ArgumentView<'_>) -> bool + Send + Sync>;

/// Validates bound request objects before the handler runs.
///
/// ```
/// use archytas_middleware::{ArgumentView, Pipeline, RequestValidator, SchemaValidator};
///
/// #[derive(Default)]
/// struct Internal;
///
/// let validator = RequestValidator::new(SchemaValidator::new())
///     .ignore(|arg: &ArgumentView<'_>| arg.downcast_ref::<Internal>().is_some());
/// let pipeline = Pipeline::builder().orthodox().with(validator).build();
/// assert_eq!(pipeline.stage_count(), 5);
/// ```
#[derive(Clone)]
pub struct RequestValidator {
    validator: Arc<dyn Validator>,
    ignore: Option<IgnoreFn>,
}

impl RequestValidator {
    /// Uses `validator` for every request object.
    pub fn new<V: Validator>(validator: V) -> Self {
        Self {
            validator: Arc::new(validator),
            ignore: None,
        }
    }

    /// Skips arguments for which `predicate` returns true.
    #[must_use]
    pub fn ignore<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ArgumentView<'_>) -> bool + Send + Sync + 'static,
    {
        self.ignore = Some(Arc::new(predicate));
        self
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(SchemaValidator::new())
    }
}

impl fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidator")
            .field("ignore", &self.ignore.is_some())
            .finish_non_exhaustive()
    }
}

impl Middleware for RequestValidator {
    fn name(&self) -> &'static str {
        "request_validator"
    }

    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
        Box::pin(async move {
            for index in 0..bubble.argument_types().len() {
                let descriptor = &bubble.argument_types()[index];
                if descriptor.codec.is_none() {
                    continue;
                }
                let Some(value) = bubble.argument(index) else {
                    continue;
                };
                let view = ArgumentView::new(index, descriptor, value);
                if self.ignore.as_ref().is_some_and(|ignore| ignore(&view)) {
                    debug!(index, "validation skipped");
                    continue;
                }
                self.validator.validate(&view)?;
            }
            bubble.next().await
        })
    }
}

/// Validator driven by field `api` attributes.
#[derive(Debug, Default)]
pub struct SchemaValidator {
    patterns: Mutex<HashMap<&'static str, Regex>>,
}

impl SchemaValidator {
    /// Creates a validator with an empty pattern cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `value` against the field attributes of `info`.
    pub fn check(&self, info: &TypeInfo, value: &Value) -> Result<(), ValidationError> {
        match value {
            Value::Object(object) if info.is_struct() => self.check_struct(info, object, ""),
            _ => Ok(()),
        }
    }

    fn check_struct(
        &self,
        info: &TypeInfo,
        object: &Map<String, Value>,
        prefix: &str,
    ) -> Result<(), ValidationError> {
        for field in info.fields() {
            if field.skip {
                continue;
            }
            let field_type = field.type_info().resolve();
            if field.flatten {
                self.check_struct(&field_type, object, prefix)?;
                continue;
            }

            let name = field.json_name();
            let label = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            };
            let value = object.get(name).unwrap_or(&Value::Null);
            self.check_field(&field, value, &label)?;

            match (field_type.kind, value) {
                (Kind::Struct(_), Value::Object(nested)) => {
                    self.check_struct(&field_type, nested, &label)?;
                }
                (Kind::Sequence(elem), Value::Array(items)) => {
                    let elem = elem().resolve();
                    if elem.is_struct() {
                        for (i, item) in items.iter().enumerate() {
                            if let Value::Object(nested) = item {
                                self.check_struct(&elem, nested, &format!("{label}[{i}]"))?;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_field(&self, field: &FieldInfo, value: &Value, label: &str) -> Result<(), ValidationError> {
        let api = &field.api;

        if api.required && is_zero(value) {
            return Err(ValidationError::bad_request(format!("{label} is required")));
        }

        if !api.enum_values.is_empty() {
            let values: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for item in values.into_iter().filter(|v| !is_zero(v)) {
                let text = scalar_text(item);
                if !api.enum_values.iter().any(|allowed| *allowed == text) {
                    return Err(ValidationError::bad_request(format!(
                        "{label}: `{text}` is not one of [{}]",
                        api.enum_values.join(", ")
                    )));
                }
            }
        }

        let number = value.as_f64().or_else(|| {
            value
                .as_str()
                .filter(|_| api.as_string)
                .and_then(|s| s.parse::<f64>().ok())
        });
        if let Some(number) = number {
            if let Some(min) = api.minimum.filter(|min| number < *min) {
                return Err(ValidationError::bad_request(format!(
                    "{label} must be at least {min}, got {number}"
                )));
            }
            if let Some(max) = api.maximum.filter(|max| number > *max) {
                return Err(ValidationError::bad_request(format!(
                    "{label} must be at most {max}, got {number}"
                )));
            }
        }

        let length = match value {
            Value::String(s) => Some(s.chars().count() as u64),
            Value::Array(items) => Some(items.len() as u64),
            _ => None,
        };
        if let Some(length) = length {
            if let Some(min) = api.min_length.filter(|min| length < *min) {
                return Err(ValidationError::bad_request(format!(
                    "{label} must have a length of at least {min}, got {length}"
                )));
            }
            if let Some(max) = api.max_length.filter(|max| length > *max) {
                return Err(ValidationError::bad_request(format!(
                    "{label} must have a length of at most {max}, got {length}"
                )));
            }
        }

        if let (Some(pattern), Value::String(text)) = (api.pattern, value) {
            if !text.is_empty() && !self.regex(pattern)?.is_match(text) {
                return Err(ValidationError::bad_request(format!(
                    "{label}: `{text}` does not match `{pattern}`"
                )));
            }
        }

        Ok(())
    }

    fn regex(&self, pattern: &'static str) -> Result<Regex, ValidationError> {
        let mut cache = self.patterns.lock();
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|e| {
            ValidationError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("invalid pattern `{pattern}`: {e}"),
            )
        })?;
        cache.insert(pattern, regex.clone());
        Ok(regex)
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, argument: &ArgumentView<'_>) -> Result<(), ChainError> {
        let (Some(info), Some(value)) = (argument.type_info(), argument.to_json()) else {
            return Ok(());
        };
        self.check(&info.resolve(), &value).map_err(ChainError::new)
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
