//! Static type descriptors.
//!
//! Handler dispatch and schema extraction both need to look at the shape of a
//! type: which fields a request object has, how they are named on the wire,
//! whether a return value is a sequence. [`Reflect`] provides that shape as a
//! [`TypeInfo`] value. Nested types are referenced through [`TypeInfoFn`]
//! pointers, so self-referential types still have finite descriptors and the
//! walker decides how deep to go.
//!
//! User types get their descriptor from `#[derive(Reflect)]`. Primitives,
//! standard collections, `chrono` timestamps and `uuid::Uuid` are covered here.

use std::any::{type_name, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::exchange::ResponseModifier;

/// Lazily produces a nested descriptor.
pub type TypeInfoFn = fn() -> TypeInfo;

/// Integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8 bits.
    W8,
    /// 16 bits.
    W16,
    /// 32 bits.
    W32,
    /// 64 bits.
    W64,
    /// Pointer sized (`isize`/`usize`), described as 64 bits.
    Size,
}

impl IntWidth {
    /// Returns true for widths that need a 64-bit representation.
    #[must_use]
    pub const fn is_64(self) -> bool {
        matches!(self, Self::W64 | Self::Size)
    }
}

/// Structural kind of a type.
#[derive(Clone, Copy)]
pub enum Kind {
    /// `bool`.
    Bool,
    /// Signed integer.
    Int(IntWidth),
    /// Unsigned integer.
    Uint(IntWidth),
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
    /// Text, including string-encoded types such as timestamps and fieldless enums.
    String,
    /// Ordered collection of one element type.
    Sequence(TypeInfoFn),
    /// A transparent wrapper (`Option`, `Box`, `Arc`) around another type.
    Indirect(TypeInfoFn),
    /// String-keyed map.
    Map(TypeInfoFn),
    /// Aggregate with named fields.
    Struct(fn() -> Vec<FieldInfo>),
}

impl Kind {
    /// Short name of the kind, used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Sequence(_) => "sequence",
            Self::Indirect(_) => "indirect",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(w) => write!(f, "Int({w:?})"),
            Self::Uint(w) => write!(f, "Uint({w:?})"),
            Self::Sequence(elem) => write!(f, "Sequence({})", elem().rust_name),
            Self::Indirect(inner) => write!(f, "Indirect({})", inner().rust_name),
            Self::Map(value) => write!(f, "Map({})", value().rust_name),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Descriptor of one type.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    /// Identity of the described type.
    pub id: TypeId,
    /// `std::any::type_name` of the described type.
    pub rust_name: &'static str,
    /// Declared name. Only user-declared types carry one.
    pub name: Option<&'static str>,
    /// Structural kind.
    pub kind: Kind,
    /// Format hint for string-encoded types (`date-time`, `uuid`, ...).
    pub format: Option<&'static str>,
    /// Closed value set for enumerations.
    pub enum_values: &'static [&'static str],
}

impl TypeInfo {
    /// Describes an anonymous type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>(kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            name: None,
            kind,
            format: None,
            enum_values: &[],
        }
    }

    /// Describes a named, user-declared type.
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: &'static str, kind: Kind) -> Self {
        Self {
            name: Some(name),
            ..Self::of::<T>(kind)
        }
    }

    /// Reuses this shape for another type under a new name.
    #[must_use]
    pub fn rebrand<T: ?Sized + 'static>(self, name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            name: Some(name),
            ..self
        }
    }

    /// Sets the format hint.
    #[must_use]
    pub const fn with_format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the enumeration values.
    #[must_use]
    pub const fn with_enum_values(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = values;
        self
    }

    /// Follows [`Kind::Indirect`] wrappers to the described type.
    #[must_use]
    pub fn resolve(self) -> Self {
        let mut info = self;
        while let Kind::Indirect(inner) = info.kind {
            info = inner();
        }
        info
    }

    /// Returns the fields of an aggregate, or nothing for other kinds.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldInfo> {
        match self.kind {
            Kind::Struct(fields) => fields(),
            _ => Vec::new(),
        }
    }

    /// Returns true for aggregates.
    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self.kind, Kind::Struct(_))
    }

    /// Returns true for sequences.
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(self.kind, Kind::Sequence(_))
    }

    /// Returns true when a schema for this type should be referenced rather
    /// than inlined: the type is named and is not a primitive.
    #[must_use]
    pub const fn allows_ref(&self) -> bool {
        self.name.is_some() && matches!(self.kind, Kind::Struct(_) | Kind::Sequence(_))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("rust_name", &self.rust_name)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("enum_values", &self.enum_values)
            .finish()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

/// Where a request-object field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    /// A path-template variable.
    Path,
    /// A URL query parameter.
    Query,
}

impl ParamLocation {
    /// The location as it appears in a schema document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
        }
    }
}

/// API metadata attached to a field with `#[api(...)]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApiAttrs {
    /// Parameter name override.
    pub name: Option<&'static str>,
    /// Declared parameter location.
    pub location: Option<ParamLocation>,
    /// Zero values are rejected.
    pub required: bool,
    /// Never exposed as a parameter.
    pub private: bool,
    /// The value travels as a JSON string.
    pub as_string: bool,
    /// Allowed values, in declaration order.
    pub enum_values: &'static [&'static str],
    /// Inclusive lower bound for numbers.
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numbers.
    pub maximum: Option<f64>,
    /// Minimum length for strings and sequences.
    pub min_length: Option<u64>,
    /// Maximum length for strings and sequences.
    pub max_length: Option<u64>,
    /// Regular expression strings must match.
    pub pattern: Option<&'static str>,
    /// Documented default value.
    pub default: Option<&'static str>,
    /// Human readable description.
    pub description: Option<&'static str>,
}

/// Descriptor of one named field.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Field identifier in the Rust declaration.
    pub ident: &'static str,
    /// Serialized name when it differs from `ident`.
    pub rename: Option<&'static str>,
    /// Descriptor of the field type.
    pub ty: TypeInfoFn,
    /// The field is not serialized.
    pub skip: bool,
    /// The field's members are promoted into the parent.
    pub flatten: bool,
    /// API metadata.
    pub api: ApiAttrs,
}

impl FieldInfo {
    /// Name of the field in JSON documents.
    #[must_use]
    pub fn json_name(&self) -> &'static str {
        self.rename.unwrap_or(self.ident)
    }

    /// Name of the field as a request parameter.
    ///
    /// The `api` name wins over the serialized name, which wins over the
    /// identifier.
    #[must_use]
    pub fn param_name(&self) -> &'static str {
        self.api.name.or(self.rename).unwrap_or(self.ident)
    }

    /// Descriptor of the field type.
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        (self.ty)()
    }

    /// Returns true if the field is hidden from parameter lists.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.skip || self.api.private
    }
}

/// Types with a static shape descriptor.
///
/// Usually derived:
///
/// ```rust
/// use archytas_core::{Kind, Reflect};
///
/// #[derive(Reflect)]
/// struct Todo {
///     id: i64,
///     text: String,
/// }
///
/// let info = Todo::type_info();
/// assert_eq!(info.name, Some("Todo"));
/// assert_eq!(info.fields().len(), 2);
/// assert!(matches!(info.kind, Kind::Struct(_)));
/// ```
pub trait Reflect: 'static {
    /// Returns the descriptor for `Self`.
    fn type_info() -> TypeInfo;

    /// Returns the response modifier that should write this value, if any.
    fn as_response_modifier(&self) -> Option<&dyn ResponseModifier> {
        None
    }
}

/// Descriptor for a type that is never walked, such as a skipped field.
#[must_use]
pub fn opaque_type_info<T: ?Sized + 'static>() -> TypeInfo {
    TypeInfo::of::<T>(Kind::Struct(Vec::new))
}

macro_rules! impl_reflect_scalar {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::of::<Self>($kind)
                }
            }
        )*
    };
}

impl_reflect_scalar! {
    bool => Kind::Bool,
    i8 => Kind::Int(IntWidth::W8),
    i16 => Kind::Int(IntWidth::W16),
    i32 => Kind::Int(IntWidth::W32),
    i64 => Kind::Int(IntWidth::W64),
    isize => Kind::Int(IntWidth::Size),
    u8 => Kind::Uint(IntWidth::W8),
    u16 => Kind::Uint(IntWidth::W16),
    u32 => Kind::Uint(IntWidth::W32),
    u64 => Kind::Uint(IntWidth::W64),
    usize => Kind::Uint(IntWidth::Size),
    f32 => Kind::Float32,
    f64 => Kind::Float64,
    char => Kind::String,
    String => Kind::String,
}

macro_rules! impl_reflect_wrapper {
    ($($wrapper:ident => $variant:ident),* $(,)?) => {
        $(
            impl<T: Reflect> Reflect for $wrapper<T> {
                fn type_info() -> TypeInfo {
                    TypeInfo::of::<Self>(Kind::$variant(T::type_info))
                }
            }
        )*
    };
}

impl_reflect_wrapper! {
    Vec => Sequence,
    VecDeque => Sequence,
    HashSet => Sequence,
    BTreeSet => Sequence,
    Option => Indirect,
    Box => Indirect,
    Arc => Indirect,
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::Sequence(T::type_info))
    }
}

impl<K: 'static, V: Reflect> Reflect for HashMap<K, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::Map(V::type_info))
    }
}

impl<K: 'static, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::Map(V::type_info))
    }
}

impl<Tz: chrono::TimeZone + 'static> Reflect for chrono::DateTime<Tz> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::String).with_format("date-time")
    }
}

impl Reflect for chrono::NaiveDateTime {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::String).with_format("date-time")
    }
}

impl Reflect for chrono::NaiveDate {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::String).with_format("date")
    }
}

impl Reflect for uuid::Uuid {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>(Kind::String).with_format("uuid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reflect;

    #[derive(serde::Serialize, Reflect)]
    #[allow(dead_code)]
    struct Node {
        #[serde(rename = "nodeId")]
        id: u64,
        #[api(name = "kids")]
        children: Vec<Node>,
        parent: Option<Box<Node>>,
        #[serde(skip)]
        scratch: std::cell::Cell<u8>,
    }

    #[test]
    fn test_scalar_kinds() {
        assert!(matches!(i64::type_info().kind, Kind::Int(IntWidth::W64)));
        assert!(matches!(u16::type_info().kind, Kind::Uint(IntWidth::W16)));
        assert!(matches!(f32::type_info().kind, Kind::Float32));
        assert!(matches!(String::type_info().kind, Kind::String));
        assert!(IntWidth::Size.is_64());
        assert!(!IntWidth::W32.is_64());
    }

    #[test]
    fn test_wrappers_resolve_to_inner_type() {
        let info = Option::<Box<String>>::type_info();
        assert!(matches!(info.kind, Kind::Indirect(_)));
        assert_eq!(info.resolve().id, TypeId::of::<String>());
    }

    #[test]
    fn test_sequence_element() {
        let info = Vec::<i32>::type_info();
        let Kind::Sequence(elem) = info.kind else {
            panic!("expected a sequence");
        };
        assert_eq!(elem().id, TypeId::of::<i32>());
        assert!(!info.allows_ref());
    }

    #[test]
    fn test_string_formats() {
        assert_eq!(
            chrono::DateTime::<chrono::Utc>::type_info().format,
            Some("date-time")
        );
        assert_eq!(chrono::NaiveDate::type_info().format, Some("date"));
        assert_eq!(uuid::Uuid::type_info().format, Some("uuid"));
    }

    #[test]
    fn test_derived_recursive_struct() {
        let info = Node::type_info();
        assert_eq!(info.name, Some("Node"));
        assert!(info.allows_ref());

        let fields = info.fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].json_name(), "nodeId");
        assert_eq!(fields[0].param_name(), "nodeId");
        assert_eq!(fields[1].param_name(), "kids");
        assert_eq!(fields[1].json_name(), "children");
        assert!(fields[3].skip);
        assert!(fields[3].is_private());

        let parent = fields[2].type_info().resolve();
        assert_eq!(parent.id, TypeId::of::<Node>());
    }

    #[test]
    fn test_type_info_equality_is_identity() {
        assert_eq!(Vec::<u8>::type_info(), Vec::<u8>::type_info());
        assert_ne!(Vec::<u8>::type_info(), Vec::<i8>::type_info());
    }
}
