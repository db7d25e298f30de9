//! Error types for routing and request handling.

use serde::Serialize;
use thiserror::Error;

use crate::request::Method;

/// Registration-time routing errors.
///
/// All of these are raised while the route table is being built. They are
/// configuration mistakes and should abort startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The same method and pattern were registered twice.
    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute {
        /// HTTP method of the route.
        method: Method,
        /// The pattern that was registered twice.
        pattern: String,
    },

    /// A param or wildcard segment clashes with a differently-named one
    /// registered at the same position.
    #[error("route conflict in '{pattern}': '{segment}' clashes with existing '{existing}'")]
    RouteConflict {
        /// The pattern being registered.
        pattern: String,
        /// The offending segment of the new pattern.
        segment: String,
        /// The segment already present in the trie.
        existing: String,
    },

    /// The pattern is malformed.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl RouterError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Boxed error stored on a [`Context`](crate::Context).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error that maps directly to an HTTP status.
///
/// Serializes as `{"code": 404, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct HttpError {
    /// HTTP status code.
    pub code: u16,
    /// Human readable message.
    pub message: String,
}

impl HttpError {
    /// Creates a new HTTP error.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 500 Internal Server Error.
    pub fn internal() -> Self {
        Self::new(500, "internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_error_display() {
        let err = RouterError::DuplicateRoute {
            method: Method::Get,
            pattern: "/users/:id".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate route: GET /users/:id");

        let err = RouterError::invalid("/a/*rest/b", "wildcard must be the final segment");
        assert_eq!(
            err.to_string(),
            "invalid path pattern '/a/*rest/b': wildcard must be the final segment"
        );
    }

    #[test]
    fn test_http_error_json() {
        let err = HttpError::new(403, "forbidden");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":403,"message":"forbidden"}"#);
        assert_eq!(err.to_string(), "403: forbidden");
    }
}
