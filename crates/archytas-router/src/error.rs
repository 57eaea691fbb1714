//! Errors raised while parsing path templates.

use thiserror::Error;

/// Result type for template operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors that can occur while parsing a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The template does not start with `/`.
    #[error("path template must start with '/': {template}")]
    MissingLeadingSlash {
        /// The offending template.
        template: String,
    },

    /// A `{` without a matching `}` or a brace in the middle of a segment.
    #[error("malformed variable segment '{segment}' in {template}")]
    MalformedSegment {
        /// The offending template.
        template: String,
        /// The segment that failed to parse.
        segment: String,
    },

    /// A variable segment with no name, e.g. `{}`.
    #[error("empty variable name in {template}")]
    EmptyVariable {
        /// The offending template.
        template: String,
    },

    /// The same variable name appears twice.
    #[error("duplicate variable '{name}' in {template}")]
    DuplicateVariable {
        /// The offending template.
        template: String,
        /// The repeated variable name.
        name: String,
    },
}

impl RouterError {
    pub(crate) fn malformed(template: &str, segment: &str) -> Self {
        Self::MalformedSegment {
            template: template.to_string(),
            segment: segment.to_string(),
        }
    }
}
