//! Stage identifiers and the per-stage deployment parameters.

use crate::routes::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::InvalidStageError;

/// A named deployment environment with its own isolated resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Production,
    Staging,
}

impl Stage {
    /// Every recognized stage, in declaration order.
    pub const ALL: [Stage; 2] = [Stage::Production, Stage::Staging];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Production => "production",
            Stage::Staging => "staging",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = InvalidStageError;

    /// Exact match only. `"Production"` or `" staging"` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| InvalidStageError::new(s))
    }
}

/// What happens to stage resources when the stage is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    Retain,
    Remove,
}

/// Cross-origin access rules enforced on the storage bucket.
///
/// An empty policy (no origins) permits no cross-origin access at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPolicy {
    pub allowed_headers: BTreeSet<String>,
    pub allowed_methods: BTreeSet<HttpMethod>,
    pub allowed_origins: BTreeSet<String>,
    pub exposed_headers: BTreeSet<String>,
    pub max_age: Duration,
}

impl CorsPolicy {
    /// A policy that permits no cross-origin access.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed_origins.is_empty()
    }
}

/// Fully-specified parameters for one stage, produced once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageConfig {
    pub stage: Stage,
    pub domain_name: String,
    pub certificate_arn: String,
    pub cors_policy: CorsPolicy,
    pub is_protected: bool,
    pub removal_policy: RemovalPolicy,
    /// Named credentials profile used against the cloud account for this stage.
    pub provider_profile: String,
}
