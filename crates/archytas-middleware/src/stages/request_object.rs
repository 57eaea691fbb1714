//! Structured request-object binding.
//!
//! The first unbound request-object slot is filled from three sources,
//! each overwriting the previous one:
//!
//! 1. path parameters stored in the context under [`PATH_PARAMETERS_KEY`]
//! 2. query parameters
//! 3. a JSON body, when the content type is `application/json`
//!
//! Path and query values are strings; they are converted to the JSON shape
//! of the target field before the object is decoded, so a non-numeric value
//! for an integer field is a bad request rather than a silent zero.

use std::fmt::Display;

use archytas_core::{
    AggregateCodec, ArgKind, BoundValue, BoxFuture, ChainError, ChainResult, FieldInfo,
    HttpErrorResponse, IntWidth, Kind, Request, TypeInfo, PATH_PARAMETERS_KEY,
};
use archytas_router::Params;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use http_body_util::BodyExt;
use indexmap::IndexMap;
use serde_json::{json, Map, Number, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::bubble::Bubble;
use crate::middleware::Middleware;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Failures of request-object binding.
#[derive(Debug, Error)]
pub enum BindError {
    /// A path parameter has no matching field in the request object.
    #[error("can't find path parameter `{name}` in request object")]
    PathParameterFieldMissing {
        /// Parameter name.
        name: String,
    },

    /// The context holds path parameters of the wrong type.
    #[error("path parameters must be stored as archytas_router::Params")]
    InvalidPathParameterType,

    /// A path or query value does not convert to its field type.
    #[error("invalid value `{value}` for `{field}`: {reason}")]
    FieldConversion {
        /// Field name in the request.
        field: String,
        /// The raw value.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// The body or the assembled object could not be decoded.
    #[error("{0}")]
    Body(String),
}

impl BindError {
    fn body(reason: impl Display) -> Self {
        Self::Body(reason.to_string())
    }

    fn conversion(field: &FieldInfo, value: &str, reason: impl Display) -> Self {
        Self::FieldConversion {
            field: field.param_name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl HttpErrorResponse for BindError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::PathParameterFieldMissing { .. } | Self::InvalidPathParameterType => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::FieldConversion { .. } | Self::Body(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_message(&self) -> Value {
        json!({
            "code": self.status_code().as_u16(),
            "message": self.to_string(),
        })
    }
}

/// Binds the structured request object.
///
/// Two-byte JSON bodies (`{}` or `[]`) are skipped unless strict bodies are
/// enabled, so an empty array posted to an object endpoint is not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestObjectMapper {
    strict_bodies: bool,
}

impl RequestObjectMapper {
    /// Creates a mapper that skips two-byte bodies.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strict_bodies: false,
        }
    }

    /// Parses two-byte bodies like any other body when `strict` is set.
    #[must_use]
    pub const fn strict_bodies(mut self, strict: bool) -> Self {
        self.strict_bodies = strict;
        self
    }

    /// Returns true if two-byte bodies are parsed.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict_bodies
    }

    async fn decode(&self, bubble: &Bubble, codec: AggregateCodec) -> Result<BoundValue, ChainError> {
        let info = (codec.type_info)().resolve();
        let fields = request_fields(&info);

        let mut object = match (codec.zero)().map_err(BindError::body)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(BindError::Body(format!(
                    "request object must be a JSON object, found {}",
                    json_kind(&other)
                ))
                .into())
            }
        };

        if let Some(raw) = bubble.context().value(PATH_PARAMETERS_KEY) {
            let params = raw
                .downcast_ref::<Params>()
                .ok_or(BindError::InvalidPathParameterType)?;
            apply_path_params(&mut object, &fields, params)?;
        }

        if let Some(query) = bubble.request().uri().query() {
            apply_query(&mut object, &fields, query)?;
        }

        if is_json(bubble.request()) {
            let body = read_body(bubble.request()).await;
            if body.len() == 2 && !self.strict_bodies {
                debug!(body = %String::from_utf8_lossy(&body), "skipping two-byte JSON body");
            } else if !body.is_empty() {
                match serde_json::from_slice::<Value>(&body).map_err(BindError::body)? {
                    Value::Object(map) => object.extend(map),
                    other => {
                        return Err(BindError::Body(format!(
                            "request body must be a JSON object, found {}",
                            json_kind(&other)
                        ))
                        .into())
                    }
                }
            }
        }

        (codec.decode)(Value::Object(object)).map_err(|e| BindError::body(e).into())
    }
}

impl Middleware for RequestObjectMapper {
    fn name(&self) -> &'static str {
        "request_object_mapper"
    }

    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
        Box::pin(async move {
            let Some(index) = bubble.first_unbound(ArgKind::Aggregate) else {
                return bubble.next().await;
            };
            let Some(codec) = bubble.argument_types()[index].codec else {
                return bubble.next().await;
            };

            let value = self.decode(bubble, codec).await?;
            bubble.bind(index, value)?;
            debug!(
                index,
                request_object = (codec.type_info)().rust_name,
                "bound request object"
            );
            bubble.next().await
        })
    }
}

/// Fields addressable by name, with flattened members promoted.
fn request_fields(info: &TypeInfo) -> Vec<FieldInfo> {
    let mut fields = Vec::new();
    for field in info.fields() {
        if field.skip {
            continue;
        }
        if field.flatten {
            fields.extend(request_fields(&field.type_info().resolve()));
        } else {
            fields.push(field);
        }
    }
    fields
}

fn find_field<'f>(fields: &'f [FieldInfo], name: &str) -> Option<&'f FieldInfo> {
    fields
        .iter()
        .find(|f| f.param_name() == name)
        .or_else(|| fields.iter().find(|f| f.json_name() == name || f.ident == name))
}

fn apply_path_params(
    object: &mut Map<String, Value>,
    fields: &[FieldInfo],
    params: &Params,
) -> Result<(), BindError> {
    for (name, value) in params {
        let field = find_field(fields, name).ok_or_else(|| BindError::PathParameterFieldMissing {
            name: name.to_string(),
        })?;
        object.insert(field.json_name().to_string(), convert_one(field, value)?);
    }
    Ok(())
}

fn apply_query(
    object: &mut Map<String, Value>,
    fields: &[FieldInfo],
    query: &str,
) -> Result<(), BindError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query).map_err(BindError::body)?;
    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }

    for (key, values) in &grouped {
        match find_field(fields, key) {
            Some(field) => {
                object.insert(field.json_name().to_string(), convert_many(field, values)?);
            }
            None => trace!(key = key.as_str(), "query parameter has no matching field"),
        }
    }
    Ok(())
}

fn convert_one(field: &FieldInfo, raw: &str) -> Result<Value, BindError> {
    convert_many(field, std::slice::from_ref(&raw.to_string()))
}

fn convert_many(field: &FieldInfo, values: &[String]) -> Result<Value, BindError> {
    let info = field.type_info().resolve();
    if let Kind::Sequence(elem) = info.kind {
        let elem = elem().resolve();
        return values
            .iter()
            .map(|raw| convert_scalar(field, &elem, raw, false))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    match values.first() {
        Some(raw) => convert_scalar(field, &info, raw, field.api.as_string),
        None => Ok(Value::Null),
    }
}

fn convert_scalar(
    field: &FieldInfo,
    info: &TypeInfo,
    raw: &str,
    as_string: bool,
) -> Result<Value, BindError> {
    let converted = match info.kind {
        Kind::Bool => parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| BindError::conversion(field, raw, "not a boolean"))?,
        Kind::Int(width) => raw
            .parse::<i64>()
            .map_err(|e| BindError::conversion(field, raw, e))
            .and_then(|v| check_signed(field, raw, v, width))
            .map(Value::from)?,
        Kind::Uint(width) => raw
            .parse::<u64>()
            .map_err(|e| BindError::conversion(field, raw, e))
            .and_then(|v| check_unsigned(field, raw, v, width))
            .map(Value::from)?,
        Kind::Float32 | Kind::Float64 => raw
            .parse::<f64>()
            .map_err(|e| BindError::conversion(field, raw, e))
            .and_then(|v| {
                Number::from_f64(v)
                    .map(Value::Number)
                    .ok_or_else(|| BindError::conversion(field, raw, "not a finite number"))
            })?,
        Kind::String => Value::String(raw.to_string()),
        other => {
            return Err(BindError::conversion(
                field,
                raw,
                format!("{} fields cannot be bound from a string", other.as_str()),
            ))
        }
    };
    if as_string {
        Ok(Value::String(raw.to_string()))
    } else {
        Ok(converted)
    }
}

fn check_signed(field: &FieldInfo, raw: &str, value: i64, width: IntWidth) -> Result<i64, BindError> {
    let fits = match width {
        IntWidth::W8 => i8::try_from(value).is_ok(),
        IntWidth::W16 => i16::try_from(value).is_ok(),
        IntWidth::W32 => i32::try_from(value).is_ok(),
        IntWidth::W64 | IntWidth::Size => true,
    };
    if fits {
        Ok(value)
    } else {
        Err(BindError::conversion(field, raw, "number out of range"))
    }
}

fn check_unsigned(
    field: &FieldInfo,
    raw: &str,
    value: u64,
    width: IntWidth,
) -> Result<u64, BindError> {
    let fits = match width {
        IntWidth::W8 => u8::try_from(value).is_ok(),
        IntWidth::W16 => u16::try_from(value).is_ok(),
        IntWidth::W32 => u32::try_from(value).is_ok(),
        IntWidth::W64 | IntWidth::Size => true,
    };
    if fits {
        Ok(value)
    } else {
        Err(BindError::conversion(field, raw, "number out of range"))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|media| media.trim() == JSON_MEDIA_TYPE)
}

async fn read_body(request: &Request) -> Bytes {
    match request.body().clone().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
