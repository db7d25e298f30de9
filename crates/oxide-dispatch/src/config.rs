//! Router configuration.

use serde::Deserialize;

/// Behavior switches for a [`Router`](crate::Router).
///
/// Deserializable so it can be loaded from a config file; missing fields keep
/// their defaults.
///
/// ```
/// use oxide_dispatch::RouterConfig;
///
/// let config: RouterConfig = serde_json::from_str(r#"{"auto_head": false}"#).unwrap();
/// assert!(!config.auto_head);
/// assert!(config.handle_method_not_allowed);
/// assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Answer HEAD with the GET route when no HEAD route exists.
    pub auto_head: bool,
    /// Answer 405 with an `Allow` header when the path exists under other
    /// methods. When off, such requests get a 404.
    pub handle_method_not_allowed: bool,
    /// Maximum number of idle contexts kept for reuse.
    pub max_idle_contexts: usize,
    /// Largest request body the server adapter buffers. Longer bodies are
    /// answered with 413.
    pub max_body_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            auto_head: true,
            handle_method_not_allowed: true,
            max_idle_contexts: 1024,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}
