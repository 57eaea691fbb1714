//! The schema registry.
//!
//! Converts [`TypeInfo`] descriptors into Swagger schemas, one cached
//! [`TypeSchema`] per distinct type. Entries live in an arena indexed by
//! [`TypeId`]. A named type's entry is pushed before the walk descends into
//! its members, so a type that is re-entered while its own walk is running
//! finds its entry and is emitted as a reference instead of being walked
//! again. Inline entries are pushed only once their members are filled.
//!
//! Named aggregates are referenced as `#/definitions/<Name>`. Primitives and
//! anonymous types (`Vec<T>`, `Option<T>`, strings with a format) are inlined
//! at every use.
//!
//! Field attributes that depend on the use site (`as_string`, `enum`, bounds,
//! descriptions) are applied to the inline copy handed to the caller, never to
//! the cached entry.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use archytas_core::{FieldInfo, IntWidth, Kind, TypeInfo};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::error::{DocsError, DocsResult};
use crate::openapi::{Schema, SchemaType};

/// Renames a definition. Receives the type and the default name.
pub type DefinitionNameModifier = Arc<dyn Fn(&TypeInfo, &str) -> String + Send + Sync>;

/// A cached schema and how it may be used.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    /// Definition name. Required when `allow_ref` is set.
    pub ref_name: String,
    /// The structural description.
    pub schema: Schema,
    /// Uses emit `#/definitions/<ref_name>` instead of the schema.
    pub allow_ref: bool,
}

impl TypeSchema {
    /// An entry that is always inlined.
    #[must_use]
    pub fn inline(schema: Schema) -> Self {
        Self {
            ref_name: String::new(),
            schema,
            allow_ref: false,
        }
    }

    /// An entry that is referenced under `name`.
    #[must_use]
    pub fn definition(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            ref_name: name.into(),
            schema,
            allow_ref: true,
        }
    }
}

/// Handle of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

struct Entry {
    rust_name: &'static str,
    schema: TypeSchema,
}

/// Memoizing type-to-schema converter.
#[derive(Default)]
pub struct SchemaRegistry {
    entries: Vec<Entry>,
    index: HashMap<TypeId, SchemaId>,
    names: HashMap<String, SchemaId>,
    walking: HashSet<TypeId>,
    name_modifier: Option<DefinitionNameModifier>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the definition name modifier.
    #[must_use]
    pub fn with_name_modifier(mut self, modifier: DefinitionNameModifier) -> Self {
        self.name_modifier = Some(modifier);
        self
    }

    /// Registers a fixed schema for `T`, bypassing the walk.
    pub fn insert_override<T: ?Sized + 'static>(
        &mut self,
        schema: TypeSchema,
    ) -> DocsResult<SchemaId> {
        self.insert_override_for(TypeId::of::<T>(), std::any::type_name::<T>(), schema)
    }

    /// Registers a fixed schema for the type identified by `type_id`.
    ///
    /// An existing entry for the type is replaced.
    pub fn insert_override_for(
        &mut self,
        type_id: TypeId,
        rust_name: &'static str,
        schema: TypeSchema,
    ) -> DocsResult<SchemaId> {
        if let Some(&id) = self.index.get(&type_id) {
            self.entries[id.0].schema = schema;
            return Ok(id);
        }
        self.push(type_id, rust_name, schema)
    }

    /// Number of cached types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry behind `id`.
    #[must_use]
    pub fn get(&self, id: SchemaId) -> &TypeSchema {
        &self.entries[id.0].schema
    }

    /// The cached entry for `type_id`, if the type was seen.
    #[must_use]
    pub fn lookup(&self, type_id: TypeId) -> Option<&TypeSchema> {
        self.index.get(&type_id).map(|id| self.get(*id))
    }

    /// Walks `info` and returns its entry, reusing the cached one when the
    /// type was seen before. Wrappers (`Option`, `Box`, `Arc`) are walked
    /// through.
    pub fn extract(&mut self, info: TypeInfo) -> DocsResult<SchemaId> {
        let info = info.resolve();
        if let Some(&id) = self.index.get(&info.id) {
            return Ok(id);
        }

        let mut schema = base_schema(&info)?;
        schema.enum_values = info.enum_values.iter().map(|v| Value::from(*v)).collect();

        if !info.allows_ref() {
            // Inline entries are cached only once complete. A walk that comes
            // back to an unfinished inline type has no name to refer to.
            if !self.walking.insert(info.id) {
                return Err(DocsError::NameRequired {
                    type_name: info.rust_name.to_string(),
                });
            }
            let filled = self.fill_members(&info, &mut schema);
            self.walking.remove(&info.id);
            filled?;
            return self.push(info.id, info.rust_name, TypeSchema::inline(schema));
        }

        let default_name = info.name.unwrap_or_default();
        let name = match &self.name_modifier {
            Some(modifier) => modifier(&info, default_name),
            None => default_name.to_string(),
        };
        let id = self.push(info.id, info.rust_name, TypeSchema::definition(name, schema.clone()))?;
        trace!(type_name = info.rust_name, "registered schema placeholder");

        self.fill_members(&info, &mut schema)?;
        self.entries[id.0].schema.schema = schema;
        Ok(id)
    }

    fn fill_members(&mut self, info: &TypeInfo, schema: &mut Schema) -> DocsResult<()> {
        match info.kind {
            Kind::Struct(_) => {
                let mut properties = IndexMap::new();
                let mut required = Vec::new();
                self.collect_properties(info, &mut properties, &mut required)?;
                schema.properties = properties;
                schema.required = required;
            }
            Kind::Sequence(elem) => {
                let items = self.schema_for(elem())?;
                schema.items = Some(Box::new(items));
            }
            _ => {}
        }
        Ok(())
    }

    /// The schema to embed where `info` is used: a reference for named
    /// aggregates, a copy of the cached schema otherwise.
    pub fn schema_for(&mut self, info: TypeInfo) -> DocsResult<Schema> {
        let id = self.extract(info)?;
        let entry = &self.entries[id.0];
        if entry.schema.allow_ref {
            if entry.schema.ref_name.is_empty() {
                return Err(DocsError::NameRequired {
                    type_name: entry.rust_name.to_string(),
                });
            }
            return Ok(Schema::reference(&entry.schema.ref_name));
        }
        Ok(entry.schema.schema.clone())
    }

    /// The schema to embed for a struct field, with the field's attributes
    /// applied to inline schemas.
    pub fn field_schema(&mut self, field: &FieldInfo) -> DocsResult<Schema> {
        let info = field.type_info().resolve();
        let mut schema = self.schema_for(info)?;
        if schema.is_reference() {
            return Ok(schema);
        }
        apply_field_attrs(&mut schema, &info, field)?;
        Ok(schema)
    }

    /// Every referenced entry, in discovery order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.entries
            .iter()
            .filter(|e| e.schema.allow_ref && !e.schema.ref_name.is_empty())
            .map(|e| (e.schema.ref_name.as_str(), &e.schema.schema))
    }

    fn push(
        &mut self,
        type_id: TypeId,
        rust_name: &'static str,
        schema: TypeSchema,
    ) -> DocsResult<SchemaId> {
        let id = SchemaId(self.entries.len());
        if schema.allow_ref && !schema.ref_name.is_empty() {
            if let Some(&other) = self.names.get(&schema.ref_name) {
                return Err(DocsError::DefinitionConflict {
                    name: schema.ref_name,
                    first: self.entries[other.0].rust_name.to_string(),
                    second: rust_name.to_string(),
                });
            }
            self.names.insert(schema.ref_name.clone(), id);
        }
        self.entries.push(Entry {
            rust_name,
            schema,
        });
        self.index.insert(type_id, id);
        Ok(id)
    }

    fn collect_properties(
        &mut self,
        info: &TypeInfo,
        properties: &mut IndexMap<String, Schema>,
        required: &mut Vec<String>,
    ) -> DocsResult<()> {
        for field in info.fields() {
            if field.skip {
                continue;
            }
            if field.flatten {
                let inner = field.type_info().resolve();
                self.collect_properties(&inner, properties, required)?;
                continue;
            }

            let name = field.json_name().to_string();
            let schema = self.field_schema(&field)?;
            if field.api.required {
                required.push(name.clone());
            }
            properties.insert(name, schema);
        }
        Ok(())
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field(
                "types",
                &self.entries.iter().map(|e| e.rust_name).collect::<Vec<_>>(),
            )
            .field("name_modifier", &self.name_modifier.is_some())
            .finish()
    }
}

/// Type and format of a resolved type, without members.
pub(crate) fn base_schema(info: &TypeInfo) -> DocsResult<Schema> {
    let schema = match info.kind {
        Kind::Bool => Schema::typed(SchemaType::Boolean),
        Kind::Int(width) | Kind::Uint(width) => {
            Schema::formatted(SchemaType::Integer, integer_format(width))
        }
        Kind::Float32 => Schema::formatted(SchemaType::Number, "float"),
        Kind::Float64 => Schema::formatted(SchemaType::Number, "double"),
        Kind::String => match info.format {
            Some(format) => Schema::formatted(SchemaType::String, format),
            None => Schema::typed(SchemaType::String),
        },
        Kind::Sequence(_) => Schema::typed(SchemaType::Array),
        Kind::Struct(_) => Schema::typed(SchemaType::Object),
        Kind::Map(_) | Kind::Indirect(_) => {
            return Err(DocsError::UnsupportedKind {
                kind: info.kind.as_str(),
                type_name: info.rust_name.to_string(),
            })
        }
    };
    Ok(schema)
}

const fn integer_format(width: IntWidth) -> &'static str {
    if width.is_64() {
        "int64"
    } else {
        "int32"
    }
}

fn apply_field_attrs(schema: &mut Schema, info: &TypeInfo, field: &FieldInfo) -> DocsResult<()> {
    let api = &field.api;

    if api.as_string {
        schema.schema_type = Some(SchemaType::String);
        if !api.enum_values.is_empty() {
            schema.enum_values = api.enum_values.iter().map(|v| Value::from(*v)).collect();
        }
    } else if !api.enum_values.is_empty() {
        match info.kind {
            Kind::Sequence(elem) => {
                let elem = elem().resolve();
                if let Some(items) = schema.items.as_deref_mut() {
                    if !items.is_reference() {
                        items.enum_values = parse_enum_values(&elem, api.enum_values)?;
                    }
                }
            }
            _ => schema.enum_values = parse_enum_values(info, api.enum_values)?,
        }
    }

    if let Some(description) = api.description {
        schema.description = Some(description.to_string());
    }
    if let Some(default) = api.default {
        schema.default = Some(
            serde_json::from_str(default).unwrap_or_else(|_| Value::from(default)),
        );
    }
    schema.minimum = api.minimum.or(schema.minimum);
    schema.maximum = api.maximum.or(schema.maximum);
    if schema.schema_type == Some(SchemaType::Array) {
        schema.min_items = api.min_length.or(schema.min_items);
        schema.max_items = api.max_length.or(schema.max_items);
    } else {
        schema.min_length = api.min_length.or(schema.min_length);
        schema.max_length = api.max_length.or(schema.max_length);
    }
    if let Some(pattern) = api.pattern {
        schema.pattern = Some(pattern.to_string());
    }
    Ok(())
}

/// Parses declared enumeration values as the field's primitive kind.
pub(crate) fn parse_enum_values(info: &TypeInfo, values: &[&str]) -> DocsResult<Vec<Value>> {
    values
        .iter()
        .map(|raw| parse_enum_value(info, raw))
        .collect()
}

fn parse_enum_value(info: &TypeInfo, raw: &str) -> DocsResult<Value> {
    let invalid = |reason: String| DocsError::InvalidEnumValue {
        value: raw.to_string(),
        kind: info.kind.as_str(),
        reason,
    };
    let value = match info.kind {
        Kind::Bool => Value::from(raw.parse::<bool>().map_err(|e| invalid(e.to_string()))?),
        Kind::Int(width) => {
            let v = raw.parse::<i64>().map_err(|e| invalid(e.to_string()))?;
            if !width.is_64() && i32::try_from(v).is_err() {
                return Err(invalid("out of range for int32".to_string()));
            }
            Value::from(v)
        }
        Kind::Uint(width) => {
            let v = raw.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
            if !width.is_64() && u32::try_from(v).is_err() {
                return Err(invalid("out of range for int32".to_string()));
            }
            Value::from(v)
        }
        Kind::Float32 => Value::from(raw.parse::<f32>().map_err(|e| invalid(e.to_string()))?),
        Kind::Float64 => Value::from(raw.parse::<f64>().map_err(|e| invalid(e.to_string()))?),
        _ => Value::from(raw),
    };
    Ok(value)
}
