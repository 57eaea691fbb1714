//! Handler signatures and type-erased invocation.
//!
//! Any `Fn(A1, .., An) -> R` with up to eight parameters is a [`Handler`] as
//! long as every parameter implements [`Param`] and `R` implements
//! [`IntoReturns`]. From that bound the handler exposes a static
//! [`Signature`]: one [`ArgDescriptor`] per parameter and one
//! [`ReturnDescriptor`] per return part. Binders read the descriptors to
//! decide which slot they can fill, and the schema assembler reads the same
//! descriptors offline.
//!
//! Slots travel as [`BoundValue`]s. Ambient parameters are stored as
//! themselves; a `Box<T>` request object is stored as the bare `T`.
//!
//! [`ReturnDescriptor`]: crate::ReturnDescriptor

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::Context;
use crate::error::{ChainError, DispatchError};
use crate::reflect::{Reflect, TypeInfo, TypeInfoFn};
use crate::returns::{IntoReturns, ReturnDescriptor, ReturnValue};
use crate::types::Request;
use crate::writer::ResponseWriter;

/// A value written into an argument slot.
pub type BoundValue = Box<dyn Any + Send + Sync>;

/// What a parameter is, as far as binders are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// `Arc<Request>`.
    Request,
    /// [`ResponseWriter`].
    ResponseWriter,
    /// [`Context`].
    Context,
    /// `Box<T>` where `T` is a reflected struct: the structured request object.
    Aggregate,
    /// Anything else; only custom binders fill these.
    Other,
}

impl ArgKind {
    /// Returns true for parameters supplied by the transport rather than
    /// decoded from the request.
    #[must_use]
    pub const fn is_ambient(self) -> bool {
        matches!(self, Self::Request | Self::ResponseWriter | Self::Context)
    }
}

/// JSON bridge for request-object parameters.
#[derive(Clone, Copy)]
pub struct AggregateCodec {
    /// Descriptor of the request object type.
    pub type_info: TypeInfoFn,
    /// The zero value (`T::default()`) as JSON.
    pub zero: fn() -> Result<Value, serde_json::Error>,
    /// Decodes JSON into a bound value.
    pub decode: fn(Value) -> Result<BoundValue, serde_json::Error>,
    /// Encodes a bound value back to JSON. `None` if the value is another type.
    pub encode: fn(&(dyn Any + Send + Sync)) -> Option<Value>,
}

impl AggregateCodec {
    /// Codec for `T`.
    #[must_use]
    pub fn of<T: RequestObject>() -> Self {
        Self {
            type_info: T::type_info,
            zero: || serde_json::to_value(T::default()),
            decode: |value| {
                let decoded: T = serde_json::from_value(value)?;
                Ok(Box::new(decoded) as BoundValue)
            },
            encode: |value| {
                value
                    .downcast_ref::<T>()
                    .and_then(|v| serde_json::to_value(v).ok())
            },
        }
    }
}

impl fmt::Debug for AggregateCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateCodec")
            .field("type", &(self.type_info)().rust_name)
            .finish_non_exhaustive()
    }
}

/// Static description of one handler parameter.
#[derive(Clone, Copy)]
pub struct ArgDescriptor {
    /// Identity of the declared parameter type.
    pub type_id: TypeId,
    /// Name of the declared parameter type.
    pub type_name: &'static str,
    /// Binder-facing classification.
    pub kind: ArgKind,
    /// JSON bridge, present for [`ArgKind::Aggregate`].
    pub codec: Option<AggregateCodec>,
    accepts: fn(&(dyn Any + Send + Sync)) -> bool,
}

impl ArgDescriptor {
    /// Descriptor for a parameter stored in its slot as itself.
    #[must_use]
    pub fn stored_as_self<P: Param>(kind: ArgKind) -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
            kind,
            codec: None,
            accepts: |value| value.is::<P>(),
        }
    }

    /// Descriptor for a parameter that custom binders fill.
    #[must_use]
    pub fn other<P: Param>() -> Self {
        Self::stored_as_self::<P>(ArgKind::Other)
    }

    /// Returns true if `value` may be written into this slot.
    #[must_use]
    pub fn accepts(&self, value: &(dyn Any + Send + Sync)) -> bool {
        (self.accepts)(value)
    }

    /// Returns true if the declared type is exactly `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Descriptor of the request object, for aggregates.
    #[must_use]
    pub fn aggregate_type(&self) -> Option<TypeInfo> {
        self.codec.map(|codec| (codec.type_info)())
    }
}

impl fmt::Debug for ArgDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgDescriptor")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("codec", &self.codec)
            .finish()
    }
}

/// A type that can appear as a handler parameter.
///
/// Custom parameter types only need a descriptor:
///
/// ```rust
/// use archytas_core::{ArgDescriptor, Param};
///
/// struct Tenant(String);
///
/// impl Param for Tenant {
///     fn descriptor() -> ArgDescriptor {
///         ArgDescriptor::other::<Self>()
///     }
/// }
/// ```
pub trait Param: Sized + Send + Sync + 'static {
    /// Static description of the parameter.
    fn descriptor() -> ArgDescriptor;

    /// Extracts the parameter from its slot, handing the value back on mismatch.
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        value.downcast::<Self>().map(|boxed| *boxed)
    }
}

impl Param for Arc<Request> {
    fn descriptor() -> ArgDescriptor {
        ArgDescriptor::stored_as_self::<Self>(ArgKind::Request)
    }
}

impl Param for ResponseWriter {
    fn descriptor() -> ArgDescriptor {
        ArgDescriptor::stored_as_self::<Self>(ArgKind::ResponseWriter)
    }
}

impl Param for Context {
    fn descriptor() -> ArgDescriptor {
        ArgDescriptor::stored_as_self::<Self>(ArgKind::Context)
    }
}

/// Types usable as a structured request object.
pub trait RequestObject: Reflect + Serialize + DeserializeOwned + Default + Send + Sync {}

impl<T> RequestObject for T where T: Reflect + Serialize + DeserializeOwned + Default + Send + Sync {}

impl<T: RequestObject> Param for Box<T> {
    fn descriptor() -> ArgDescriptor {
        let is_struct = T::type_info().resolve().is_struct();
        ArgDescriptor {
            type_id: TypeId::of::<Self>(),
            type_name: type_name::<Self>(),
            kind: if is_struct {
                ArgKind::Aggregate
            } else {
                ArgKind::Other
            },
            codec: Some(AggregateCodec::of::<T>()),
            accepts: |value| value.is::<T>(),
        }
    }

    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        value.downcast::<T>()
    }
}

/// Parameter and return descriptors of a handler.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Parameters in declaration order.
    pub params: Vec<ArgDescriptor>,
    /// Return parts in declaration order.
    pub returns: Vec<ReturnDescriptor>,
}

impl Signature {
    /// The first non-ambient parameter, with its position.
    #[must_use]
    pub fn request_param(&self) -> Option<(usize, &ArgDescriptor)> {
        self.params
            .iter()
            .enumerate()
            .find(|(_, arg)| !arg.kind.is_ambient())
    }
}

/// A callable with a static signature.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Describes parameters and returns.
    fn signature(&self) -> Signature;

    /// Invokes the handler with one slot per parameter.
    fn call(&self, args: Vec<Option<BoundValue>>) -> Result<Vec<ReturnValue>, ChainError>;
}

fn take_argument<P: Param>(index: usize, slot: Option<BoundValue>) -> Result<P, ChainError> {
    let value = slot.ok_or(DispatchError::UnboundArgument {
        index,
        type_name: type_name::<P>(),
    })?;
    P::from_bound(value).map_err(|_| {
        DispatchError::ArgumentTypeMismatch {
            index,
            expected: type_name::<P>(),
        }
        .into()
    })
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturns,
            $($arg: Param,)*
        {
            fn signature(&self) -> Signature {
                Signature {
                    params: vec![$($arg::descriptor()),*],
                    returns: R::descriptors(),
                }
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(&self, args: Vec<Option<BoundValue>>) -> Result<Vec<ReturnValue>, ChainError> {
                let arity = <[&str]>::len(&[$(stringify!($arg)),*]);
                if args.len() != arity {
                    return Err(DispatchError::ArityMismatch {
                        expected: arity,
                        actual: args.len(),
                    }
                    .into());
                }
                let mut slots = args.into_iter();
                let mut index = 0_usize;
                $(
                    let $arg = take_argument::<$arg>(index, slots.next().flatten())?;
                    index += 1;
                )*
                Ok((self)($($arg),*).into_returns())
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Object-safe view of a [`Handler`].
pub trait ErasedHandler: Send + Sync + 'static {
    /// The signature, computed once at registration.
    fn signature(&self) -> &Signature;

    /// Invokes the handler.
    fn call(&self, args: Vec<Option<BoundValue>>) -> Result<Vec<ReturnValue>, ChainError>;
}

/// Stores a [`Handler`] together with its signature.
pub struct HandlerFn<H, Args> {
    handler: H,
    signature: Signature,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> HandlerFn<H, Args>
where
    H: Handler<Args>,
{
    /// Wraps a handler.
    pub fn new(handler: H) -> Self {
        let signature = handler.signature();
        Self {
            handler,
            signature,
            _args: PhantomData,
        }
    }
}

impl<H, Args> ErasedHandler for HandlerFn<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, args: Vec<Option<BoundValue>>) -> Result<Vec<ReturnValue>, ChainError> {
        self.handler.call(args)
    }
}

/// Shared, type-erased handler.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Erases a handler.
///
/// ```rust
/// use archytas_core::{into_handler, ArgKind, ResponseWriter};
///
/// let handler = into_handler(|w: ResponseWriter| w.write(b"ok"));
/// assert_eq!(handler.signature().params[0].kind, ArgKind::ResponseWriter);
/// assert!(handler.signature().returns.is_empty());
/// ```
pub fn into_handler<H, Args>(handler: H) -> BoxedHandler
where
    H: Handler<Args>,
    Args: 'static,
{
    Arc::new(HandlerFn::new(handler))
}
