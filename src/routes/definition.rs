//! Route definitions: the binding of an HTTP method and path to a compute
//! handler plus its access and resource policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::RouteTableError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RouteTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(RouteTableError::InvalidRoute {
                input: other.to_string(),
                reason: "unknown HTTP method".to_string(),
            }),
        }
    }
}

/// Identity of a route within one gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Parses the `"POST /v1/run-simulation"` declaration form.
impl FromStr for RouteKey {
    type Err = RouteTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RouteTableError::InvalidRoute {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (method, path) = s
            .split_once(' ')
            .ok_or_else(|| invalid("expected 'METHOD /path'"))?;
        let method: HttpMethod = method.parse().map_err(|_| invalid("unknown HTTP method"))?;
        if !path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }
        if path.contains(char::is_whitespace) {
            return Err(invalid("path must not contain whitespace"));
        }
        Ok(Self::new(method, path))
    }
}

/// Opaque reference to a deployable compute unit.
///
/// The handler's logic is never inspected; only its identity and packaging
/// are passed through to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerRef {
    pub name: String,
    pub runtime: String,
    pub entry_point: String,
    pub container: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceLimits {
    pub timeout: Duration,
    pub memory_mb: u32,
}

/// A handler environment value: either a literal, or the name of a secret the
/// orchestrator resolves at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum EnvValue {
    Literal(String),
    Secret(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDefinition {
    pub key: RouteKey,
    pub handler: HandlerRef,
    pub limits: ResourceLimits,
    pub requires_api_key: bool,
    pub environment: BTreeMap<String, EnvValue>,
}

impl RouteDefinition {
    pub fn new(key: RouteKey, handler: HandlerRef, limits: ResourceLimits) -> Self {
        Self {
            key,
            handler,
            limits,
            requires_api_key: false,
            environment: BTreeMap::new(),
        }
    }

    pub fn with_api_key(mut self) -> Self {
        self.requires_api_key = true;
        self
    }

    /// Declares an environment variable filled from the named secret.
    pub fn with_secret(mut self, var: impl Into<String>, secret: impl Into<String>) -> Self {
        self.environment.insert(var.into(), EnvValue::Secret(secret.into()));
        self
    }

    pub fn with_literal(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(var.into(), EnvValue::Literal(value.into()));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.key.method
    }

    pub fn path(&self) -> &str {
        &self.key.path
    }

    /// Names of the secrets this route references.
    pub fn secret_names(&self) -> impl Iterator<Item = &str> {
        self.environment.values().filter_map(|value| match value {
            EnvValue::Secret(name) => Some(name.as_str()),
            EnvValue::Literal(_) => None,
        })
    }
}
