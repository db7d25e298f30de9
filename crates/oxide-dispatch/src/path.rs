//! Path pattern parsing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, RouterError};

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A literal string segment.
    Literal(String),
    /// A parameter segment (e.g., `:id`), matching one path element.
    Param(Arc<str>),
    /// A wildcard segment (e.g., `*rest`), matching the remainder of the path.
    Wildcard(Arc<str>),
}

impl PathSegment {
    /// Returns the segment as written in a pattern.
    pub fn to_pattern_string(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::Param(name) => format!(":{name}"),
            Self::Wildcard(name) => format!("*{name}"),
        }
    }
}

/// A parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The normalized pattern string.
    pattern: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    /// - `/files/*path` - Wildcard parameter (matches rest of path)
    ///
    /// Empty segments are ignored, so `/users/` and `//users` both parse to
    /// `/users`.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id/comments/:comment_id").unwrap();
    /// assert_eq!(pattern.param_names(), vec!["id", "comment_id"]);
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut parts = pattern.split('/').filter(|s| !s.is_empty()).peekable();

        while let Some(part) = parts.next() {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouterError::invalid(pattern, "parameter name is empty"));
                }
                segments.push(PathSegment::Param(Arc::from(name)));
            } else if let Some(name) = part.strip_prefix('*') {
                if name.is_empty() {
                    return Err(RouterError::invalid(pattern, "wildcard name is empty"));
                }
                if parts.peek().is_some() {
                    return Err(RouterError::invalid(
                        pattern,
                        "wildcard must be the final segment",
                    ));
                }
                segments.push(PathSegment::Wildcard(Arc::from(name)));
            } else {
                segments.push(PathSegment::Literal(part.to_string()));
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let PathSegment::Param(name) | PathSegment::Wildcard(name) = segment {
                if seen.contains(&&**name) {
                    return Err(RouterError::invalid(
                        pattern,
                        format!("parameter '{name}' appears more than once"),
                    ));
                }
                seen.push(name);
            }
        }

        let pattern = if segments.is_empty() {
            "/".to_string()
        } else {
            segments
                .iter()
                .map(|s| format!("/{}", s.to_pattern_string()))
                .collect()
        };

        Ok(Self { pattern, segments })
    }

    /// Returns the normalized pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the parameter names, in order.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Param(name) | PathSegment::Wildcard(name) => Some(&**name),
                PathSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Generates a path from parameters.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use oxide_dispatch::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id").unwrap();
    /// let params: HashMap<String, String> =
    ///     [("id".to_string(), "123".to_string())]
    ///     .into_iter()
    ///     .collect();
    /// let path = pattern.reverse(&params).unwrap();
    /// assert_eq!(path, "/posts/123");
    /// ```
    pub fn reverse(&self, params: &HashMap<String, String>) -> Option<String> {
        let mut path = String::new();

        for segment in &self.segments {
            path.push('/');
            match segment {
                PathSegment::Literal(s) => path.push_str(s),
                PathSegment::Param(name) | PathSegment::Wildcard(name) => {
                    path.push_str(params.get(&**name)?);
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }

        Some(path)
    }
}

/// Joins a scope prefix and a route path.
///
/// Scopes may be declared with or without slashes (`"api"`, `"/api/"`), and
/// routes may use an empty path to target the scope itself.
pub(crate) fn join(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{path}"),
    }
}
