//! Error types for the documentation crate.
//!
//! Every error here is a schema-build error: it aborts the startup scan
//! rather than letting the mux serve a partial document.

use thiserror::Error;

/// Errors that can occur while building the Swagger document.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the document to JSON.
    #[error("failed to serialize swagger document: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The document is missing required information.
    #[error("swagger document missing required field: {field}")]
    MissingField {
        /// Dotted path of the missing field.
        field: String,
    },

    /// A type that must be referenced has no definition name.
    #[error("definition name is required for {type_name}")]
    NameRequired {
        /// Rust name of the type.
        type_name: String,
    },

    /// Two distinct types claim the same definition name.
    #[error("definition '{name}' is claimed by both {first} and {second}")]
    DefinitionConflict {
        /// The contested definition name.
        name: String,
        /// Type that registered the name first.
        first: String,
        /// Type that tried to register it again.
        second: String,
    },

    /// The walker met a kind it cannot describe.
    #[error("unknown schema type: {kind} ({type_name})")]
    UnsupportedKind {
        /// Short kind name.
        kind: &'static str,
        /// Rust name of the type.
        type_name: String,
    },

    /// An `enum` value does not parse as the field's primitive kind.
    #[error("invalid enum value '{value}' for {kind}: {reason}")]
    InvalidEnumValue {
        /// The offending value.
        value: String,
        /// The field kind it was parsed as.
        kind: &'static str,
        /// Parser message.
        reason: String,
    },

    /// A request field cannot be described as a path or query parameter.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A route uses a method the document has no slot for.
    #[error("unknown method: {method}")]
    UnknownMethod {
        /// The method as registered.
        method: String,
    },
}

impl DocsError {
    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error() {
        let err: DocsError = serde_json::from_str::<String>("invalid")
            .unwrap_err()
            .into();
        assert!(matches!(err, DocsError::SerializationError(_)));
        assert!(err.to_string().contains("serialize"));
    }

    #[test]
    fn test_missing_field_error() {
        let err = DocsError::missing("info.title");
        assert!(err.to_string().contains("info.title"));
    }

    #[test]
    fn test_unknown_method_error() {
        let err = DocsError::UnknownMethod {
            method: "TRACE".to_string(),
        };
        assert_eq!(err.to_string(), "unknown method: TRACE");
    }

    #[test]
    fn test_invalid_parameter_error() {
        let err = DocsError::invalid_parameter("list", "items type is required");
        assert!(err.to_string().contains("'list'"));
        assert!(err.to_string().contains("items type is required"));
    }
}
