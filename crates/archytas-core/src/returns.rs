//! Handler return values.
//!
//! A handler returns one of:
//!
//! - `()`
//! - a payload part: `Option<T>` (nil-able), `Box<T>` or `Vec<T>`
//! - `Result<P, E>` where `P` is `()` or a payload part
//! - a tuple of two or three parts, where `Result<(), E>` is an error part
//!
//! Each part becomes one [`ReturnValue`] in declaration order, so the
//! response mapper can apply its "errors in reverse, payloads forward" scan
//! without knowing the concrete types.

use std::any::{type_name, Any};
use std::fmt;

use serde::Serialize;

use crate::error::{ChainError, ErrorClass, HandlerError};
use crate::exchange::ResponseModifier;
use crate::reflect::{Reflect, TypeInfoFn};

/// A serializable success value.
pub trait Payload: Send + Sync + 'static {
    /// Serializes the value, pretty-printed with two-space indentation when asked.
    fn to_json(&self, pretty: bool) -> Result<Vec<u8>, serde_json::Error>;

    /// The response modifier this value delegates to, if any.
    fn response_modifier(&self) -> Option<&dyn ResponseModifier>;

    /// The value as [`Any`].
    fn value_any(&self) -> &dyn Any;
}

impl<T> Payload for T
where
    T: Serialize + Reflect + Send + Sync,
{
    fn to_json(&self, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
        if pretty {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        }
    }

    fn response_modifier(&self) -> Option<&dyn ResponseModifier> {
        self.as_response_modifier()
    }

    fn value_any(&self) -> &dyn Any {
        self
    }
}

/// One captured return value.
pub enum ReturnValue {
    /// A success part. `value` is `None` for a nil payload.
    Payload {
        /// Whether the declared type is a sequence.
        sequence: bool,
        /// The value, if any.
        value: Option<Box<dyn Payload>>,
    },
    /// An error part. `None` when the handler reported no error.
    Error(Option<ChainError>),
}

impl ReturnValue {
    /// Returns true for error parts, nil or not.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The error, for non-nil error parts.
    #[must_use]
    pub const fn error(&self) -> Option<&ChainError> {
        match self {
            Self::Error(err) => err.as_ref(),
            Self::Payload { .. } => None,
        }
    }

    /// The payload, for non-nil payload parts.
    #[must_use]
    pub fn payload(&self) -> Option<&dyn Payload> {
        match self {
            Self::Payload { value, .. } => value.as_deref(),
            Self::Error(_) => None,
        }
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload { sequence, value } => f
                .debug_struct("Payload")
                .field("sequence", sequence)
                .field("nil", &value.is_none())
                .finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

/// What a return part is.
#[derive(Debug, Clone, Copy)]
pub enum ReturnRole {
    /// A success payload of the given type.
    Payload(TypeInfoFn),
    /// An error of the given class.
    Error(ErrorClass),
}

/// Static description of one return part.
#[derive(Debug, Clone, Copy)]
pub struct ReturnDescriptor {
    /// Declared Rust type of the part.
    pub type_name: &'static str,
    /// Payload or error.
    pub role: ReturnRole,
}

impl ReturnDescriptor {
    /// Returns true for error parts.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.role, ReturnRole::Error(_))
    }
}

/// Error types a handler may declare.
pub trait ReturnError: Send + Sync + 'static {
    /// Schema class of the declared type.
    fn error_class() -> ErrorClass;

    /// Converts into the chain error.
    fn into_chain_error(self) -> ChainError;
}

impl<E: HandlerError> ReturnError for E {
    fn error_class() -> ErrorClass {
        <E as HandlerError>::error_class()
    }

    fn into_chain_error(self) -> ChainError {
        ChainError::new(self)
    }
}

impl ReturnError for ChainError {
    fn error_class() -> ErrorClass {
        ErrorClass::Generic
    }

    fn into_chain_error(self) -> ChainError {
        self
    }
}

/// One element of a handler's return tuple.
pub trait ReturnPart: Send + 'static {
    /// Static description of the part.
    fn descriptor() -> ReturnDescriptor;

    /// Captures the part.
    fn into_return_value(self) -> ReturnValue;
}

/// Success side of a `Result` return: `()` or a single payload part.
pub trait ReturnPayload: Send + 'static {
    /// Descriptors of the payload parts.
    fn descriptors() -> Vec<ReturnDescriptor>;

    /// Captures the payload parts.
    fn into_values(self) -> Vec<ReturnValue>;

    /// Nil placeholders used when the `Result` is an error.
    fn nil_values() -> Vec<ReturnValue>;
}

fn payload_descriptor<P: Reflect>(declared: &'static str) -> ReturnDescriptor {
    ReturnDescriptor {
        type_name: declared,
        role: ReturnRole::Payload(P::type_info),
    }
}

fn is_sequence<P: Reflect>() -> bool {
    P::type_info().resolve().is_sequence()
}

fn nil_payload(descriptor: ReturnDescriptor) -> ReturnValue {
    let sequence = match descriptor.role {
        ReturnRole::Payload(info) => info().resolve().is_sequence(),
        ReturnRole::Error(_) => false,
    };
    ReturnValue::Payload {
        sequence,
        value: None,
    }
}

impl<T> ReturnPart for Option<T>
where
    T: Serialize + Reflect + Send + Sync,
{
    fn descriptor() -> ReturnDescriptor {
        payload_descriptor::<T>(type_name::<Self>())
    }

    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Payload {
            sequence: is_sequence::<T>(),
            value: self.map(|v| Box::new(v) as Box<dyn Payload>),
        }
    }
}

impl<T> ReturnPart for Box<T>
where
    T: Serialize + Reflect + Send + Sync,
{
    fn descriptor() -> ReturnDescriptor {
        payload_descriptor::<T>(type_name::<Self>())
    }

    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Payload {
            sequence: is_sequence::<T>(),
            value: Some(self as Box<dyn Payload>),
        }
    }
}

impl<T> ReturnPart for Vec<T>
where
    T: Serialize + Reflect + Send + Sync,
{
    fn descriptor() -> ReturnDescriptor {
        payload_descriptor::<Self>(type_name::<Self>())
    }

    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Payload {
            sequence: true,
            value: Some(Box::new(self)),
        }
    }
}

impl<E: ReturnError> ReturnPart for Result<(), E> {
    fn descriptor() -> ReturnDescriptor {
        ReturnDescriptor {
            type_name: type_name::<E>(),
            role: ReturnRole::Error(<E as ReturnError>::error_class()),
        }
    }

    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Error(self.err().map(ReturnError::into_chain_error))
    }
}

impl ReturnPayload for () {
    fn descriptors() -> Vec<ReturnDescriptor> {
        Vec::new()
    }

    fn into_values(self) -> Vec<ReturnValue> {
        Vec::new()
    }

    fn nil_values() -> Vec<ReturnValue> {
        Vec::new()
    }
}

macro_rules! impl_payload_part {
    ($($wrapper:ident),*) => {
        $(
            impl<T> ReturnPayload for $wrapper<T>
            where
                T: Serialize + Reflect + Send + Sync,
            {
                fn descriptors() -> Vec<ReturnDescriptor> {
                    vec![<Self as ReturnPart>::descriptor()]
                }

                fn into_values(self) -> Vec<ReturnValue> {
                    vec![self.into_return_value()]
                }

                fn nil_values() -> Vec<ReturnValue> {
                    vec![nil_payload(<Self as ReturnPart>::descriptor())]
                }
            }

            impl<T> IntoReturns for $wrapper<T>
            where
                T: Serialize + Reflect + Send + Sync,
            {
                fn descriptors() -> Vec<ReturnDescriptor> {
                    vec![<Self as ReturnPart>::descriptor()]
                }

                fn into_returns(self) -> Vec<ReturnValue> {
                    vec![self.into_return_value()]
                }
            }
        )*
    };
}

impl_payload_part!(Option, Box, Vec);

/// Everything a handler may return.
pub trait IntoReturns: Send + 'static {
    /// Descriptors of the return parts.
    fn descriptors() -> Vec<ReturnDescriptor>;

    /// Captures the return parts.
    fn into_returns(self) -> Vec<ReturnValue>;
}

impl IntoReturns for () {
    fn descriptors() -> Vec<ReturnDescriptor> {
        Vec::new()
    }

    fn into_returns(self) -> Vec<ReturnValue> {
        Vec::new()
    }
}

impl<P: ReturnPayload, E: ReturnError> IntoReturns for Result<P, E> {
    fn descriptors() -> Vec<ReturnDescriptor> {
        let mut descriptors = P::descriptors();
        descriptors.push(<Result<(), E> as ReturnPart>::descriptor());
        descriptors
    }

    fn into_returns(self) -> Vec<ReturnValue> {
        match self {
            Ok(payload) => {
                let mut values = payload.into_values();
                values.push(ReturnValue::Error(None));
                values
            }
            Err(err) => {
                let mut values = P::nil_values();
                values.push(ReturnValue::Error(Some(err.into_chain_error())));
                values
            }
        }
    }
}

impl<A: ReturnPart, B: ReturnPart> IntoReturns for (A, B) {
    fn descriptors() -> Vec<ReturnDescriptor> {
        vec![A::descriptor(), B::descriptor()]
    }

    fn into_returns(self) -> Vec<ReturnValue> {
        vec![self.0.into_return_value(), self.1.into_return_value()]
    }
}

impl<A: ReturnPart, B: ReturnPart, C: ReturnPart> IntoReturns for (A, B, C) {
    fn descriptors() -> Vec<ReturnDescriptor> {
        vec![A::descriptor(), B::descriptor(), C::descriptor()]
    }

    fn into_returns(self) -> Vec<ReturnValue> {
        vec![
            self.0.into_return_value(),
            self.1.into_return_value(),
            self.2.into_return_value(),
        ]
    }
}
