//! Error types for the route table.

use thiserror::Error;

use super::RouteKey;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteTableError {
    /// Two definitions share the same `(method, path)` identity.
    #[error("Duplicate route {key}: declared by '{first}' and '{second}'")]
    DuplicateRoute {
        key: RouteKey,
        first: String,
        second: String,
    },

    /// The same API name and version were registered twice.
    #[error("Duplicate API entry: {api} {version}")]
    DuplicateApi { api: String, version: String },

    /// A `"METHOD /path"` declaration could not be parsed.
    #[error("Invalid route '{input}': {reason}")]
    InvalidRoute { input: String, reason: String },
}
