use crate::routes::HttpMethod;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use super::{CorsPolicy, InvalidStageError, RemovalPolicy, Stage, StageConfig};

const PRODUCTION_DOMAIN: &str = "api.example";
const STAGING_DOMAIN: &str = "staging.api.example";

const PRODUCTION_CERTIFICATE_ARN: &str =
    "arn:aws:acm:ap-northeast-1:111111111111:certificate/00000000-0000-4000-8000-000000000001";
const STAGING_CERTIFICATE_ARN: &str =
    "arn:aws:acm:ap-northeast-1:222222222222:certificate/00000000-0000-4000-8000-000000000002";

const PRODUCTION_PROFILE: &str = "calc-production";
const STAGING_PROFILE: &str = "calc-staging";

/// Parameters for a single stage as stored in the resolver's table.
#[derive(Debug, Clone)]
struct StageEntry {
    domain_name: String,
    certificate_arn: String,
    cors_policy: CorsPolicy,
    provider_profile: String,
}

/// Maps a stage to its [`StageConfig`].
///
/// The table has exactly one entry per [`Stage`] variant, so lookups by
/// `Stage` cannot miss. Protection and removal policy are not stored in the
/// table; they are derived from the stage so that only production is ever
/// protected.
#[derive(Debug, Clone)]
pub struct StageResolver {
    production: StageEntry,
    staging: StageEntry,
}

impl StageResolver {
    /// The compiled-in stage table.
    pub fn standard() -> Self {
        Self {
            production: StageEntry {
                domain_name: PRODUCTION_DOMAIN.to_string(),
                certificate_arn: PRODUCTION_CERTIFICATE_ARN.to_string(),
                cors_policy: CorsPolicy::none(),
                provider_profile: PRODUCTION_PROFILE.to_string(),
            },
            staging: StageEntry {
                domain_name: STAGING_DOMAIN.to_string(),
                certificate_arn: STAGING_CERTIFICATE_ARN.to_string(),
                cors_policy: staging_cors(),
                provider_profile: STAGING_PROFILE.to_string(),
            },
        }
    }

    /// Parses `input` and resolves it.
    ///
    /// # Errors
    /// [`InvalidStageError`] if `input` is not a recognized stage. There is no
    /// default stage.
    pub fn resolve(&self, input: &str) -> Result<StageConfig, InvalidStageError> {
        let stage: Stage = input.parse()?;
        Ok(self.config_for(stage))
    }

    /// Total lookup for an already-validated stage.
    pub fn config_for(&self, stage: Stage) -> StageConfig {
        let entry = match stage {
            Stage::Production => &self.production,
            Stage::Staging => &self.staging,
        };
        let is_production = stage == Stage::Production;
        debug!(%stage, domain = %entry.domain_name, "Resolved stage");

        StageConfig {
            stage,
            domain_name: entry.domain_name.clone(),
            certificate_arn: entry.certificate_arn.clone(),
            cors_policy: entry.cors_policy.clone(),
            is_protected: is_production,
            removal_policy: if is_production {
                RemovalPolicy::Retain
            } else {
                RemovalPolicy::Remove
            },
            provider_profile: entry.provider_profile.clone(),
        }
    }
}

impl Default for StageResolver {
    fn default() -> Self {
        Self::standard()
    }
}

fn staging_cors() -> CorsPolicy {
    CorsPolicy {
        allowed_headers: BTreeSet::from(["*".to_string()]),
        allowed_methods: BTreeSet::from([HttpMethod::Get, HttpMethod::Put]),
        allowed_origins: BTreeSet::from([
            "http://localhost:3000".to_string(),
            "https://mock-calc.example".to_string(),
        ]),
        exposed_headers: BTreeSet::from(["ETag".to_string()]),
        max_age: Duration::from_secs(3000),
    }
}
