//! Path template parsing and matching.

use std::fmt;

use crate::error::{RouterError, RouterResult};
use crate::params::Params;

/// One `/`-separated piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text.
    Literal(String),
    /// Matches any non-empty segment and captures it under this name.
    Variable(String),
}

impl Segment {
    /// Returns the variable name for variable segments.
    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Literal(_) => None,
        }
    }
}

/// A parsed route path such as `/api/todo/{id}`.
///
/// Empty segments are ignored, so `/api/todo/` and `/api/todo` describe the
/// same template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Fails when the template does not start with `/`, when a segment has
    /// unbalanced or embedded braces, or when a variable is empty or repeated.
    pub fn parse(template: &str) -> RouterResult<Self> {
        if !template.starts_with('/') {
            return Err(RouterError::MissingLeadingSlash {
                template: template.to_string(),
            });
        }

        let mut segments: Vec<Segment> = Vec::new();
        for piece in template.split('/').filter(|s| !s.is_empty()) {
            let segment = match piece.strip_prefix('{') {
                Some(rest) => {
                    let name = rest
                        .strip_suffix('}')
                        .ok_or_else(|| RouterError::malformed(template, piece))?;
                    if name.contains(['{', '}']) {
                        return Err(RouterError::malformed(template, piece));
                    }
                    if name.is_empty() {
                        return Err(RouterError::EmptyVariable {
                            template: template.to_string(),
                        });
                    }
                    if segments.iter().any(|s| s.variable() == Some(name)) {
                        return Err(RouterError::DuplicateVariable {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    Segment::Variable(name.to_string())
                }
                None if piece.contains(['{', '}']) => {
                    return Err(RouterError::malformed(template, piece));
                }
                None => Segment::Literal(piece.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// Returns the template exactly as it was registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over variable names in template order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::variable)
    }

    /// Returns true if the template declares a variable with this name.
    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter_names().any(|n| n == name)
    }

    /// Number of literal segments, used to rank competing matches.
    #[must_use]
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Matches a request path, returning the captured variables.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let mut pieces = path.split('/').filter(|s| !s.is_empty());
        let mut params = Params::new();

        for segment in &self.segments {
            let piece = pieces.next()?;
            match segment {
                Segment::Literal(text) if text == piece => {}
                Segment::Literal(_) => return None,
                Segment::Variable(name) => params.push(name.as_str(), piece),
            }
        }

        if pieces.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_literal_and_variable_segments() {
        let template = PathTemplate::parse("/api/todo/{id}").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("api".to_string()),
                Segment::Literal("todo".to_string()),
                Segment::Variable("id".to_string()),
            ]
        );
        assert!(template.has_parameter("id"));
        assert!(!template.has_parameter("todo"));
        assert_eq!(template.literal_count(), 2);
        assert_eq!(template.to_string(), "/api/todo/{id}");
    }

    #[test]
    fn test_parse_root() {
        let template = PathTemplate::parse("/").unwrap();
        assert!(template.segments().is_empty());
        assert!(template.match_path("/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        assert!(matches!(
            PathTemplate::parse("api"),
            Err(RouterError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/api/{id"),
            Err(RouterError::MalformedSegment { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/api/x{id}"),
            Err(RouterError::MalformedSegment { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/api/{}"),
            Err(RouterError::EmptyVariable { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/{id}/{id}"),
            Err(RouterError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn test_match_extracts_variables() {
        let template = PathTemplate::parse("/users/{user}/posts/{post}").unwrap();
        let params = template.match_path("/users/alice/posts/42").unwrap();
        assert_eq!(params.get("user"), Some("alice"));
        assert_eq!(params.get("post"), Some("42"));
    }

    #[test]
    fn test_match_rejects_length_and_literal_mismatch() {
        let template = PathTemplate::parse("/api/todo/{id}").unwrap();
        assert!(template.match_path("/api/todo").is_none());
        assert!(template.match_path("/api/todo/1/extra").is_none());
        assert!(template.match_path("/api/note/1").is_none());
    }

    #[test]
    fn test_match_ignores_trailing_slash() {
        let template = PathTemplate::parse("/api/todo").unwrap();
        assert!(template.match_path("/api/todo/").is_some());
    }

    proptest! {
        #[test]
        fn prop_variable_values_round_trip(id in "[a-zA-Z0-9_.-]{1,16}", slug in "[a-z0-9-]{1,16}") {
            let template = PathTemplate::parse("/items/{id}/{slug}").unwrap();
            let params = template.match_path(&format!("/items/{id}/{slug}")).unwrap();
            prop_assert_eq!(params.get("id"), Some(id.as_str()));
            prop_assert_eq!(params.get("slug"), Some(slug.as_str()));
        }
    }
}
