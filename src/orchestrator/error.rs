//! Error types for provisioning runs.

use std::fmt;
use thiserror::Error;

use crate::provider::ProviderError;
use crate::routes::RouteKey;
use crate::secrets::SecretsError;
use crate::stage::{InvalidStageError, Stage};

/// The named steps of a provisioning run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisionStep {
    ValidateStage,
    ResolveSecrets,
    CreateBucket,
    CreateGateway,
    RegisterRoutes,
    Deploy,
    AttachUsagePlan,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProvisionStep::ValidateStage => "validate-stage",
            ProvisionStep::ResolveSecrets => "resolve-secrets",
            ProvisionStep::CreateBucket => "create-bucket",
            ProvisionStep::CreateGateway => "create-gateway",
            ProvisionStep::RegisterRoutes => "register-routes",
            ProvisionStep::Deploy => "deploy",
            ProvisionStep::AttachUsagePlan => "attach-usage-plan",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Bucket,
    Gateway,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Bucket => "bucket",
            ResourceKind::Gateway => "gateway",
        })
    }
}

/// A fatal provisioning failure. The run stopped at [`ProvisionError::step`]
/// and nothing after it was attempted.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Raised before any side effect.
    #[error(transparent)]
    InvalidStage(#[from] InvalidStageError),

    /// Raised before any side effect.
    #[error("[{stage}] failed to resolve secret '{name}'")]
    SecretResolution {
        stage: Stage,
        name: String,
        #[source]
        source: SecretsError,
    },

    #[error("[{stage}] failed to create {resource} '{name}'")]
    ResourceCreation {
        stage: Stage,
        resource: ResourceKind,
        name: String,
        #[source]
        source: ProviderError,
    },

    /// Routes registered before the failure stay registered; deployment was
    /// not attempted.
    #[error("[{stage}] failed to register route {route} on gateway {gateway_id} ({registered} already registered)")]
    RouteRegistration {
        stage: Stage,
        gateway_id: String,
        route: RouteKey,
        registered: usize,
        #[source]
        source: ProviderError,
    },

    /// All routes are registered but unpublished.
    #[error("[{stage}] failed to deploy gateway {gateway_id}")]
    Deployment {
        stage: Stage,
        gateway_id: String,
        #[source]
        source: ProviderError,
    },
}

impl ProvisionError {
    pub fn step(&self) -> ProvisionStep {
        match self {
            ProvisionError::InvalidStage(_) => ProvisionStep::ValidateStage,
            ProvisionError::SecretResolution { .. } => ProvisionStep::ResolveSecrets,
            ProvisionError::ResourceCreation {
                resource: ResourceKind::Bucket,
                ..
            } => ProvisionStep::CreateBucket,
            ProvisionError::ResourceCreation {
                resource: ResourceKind::Gateway,
                ..
            } => ProvisionStep::CreateGateway,
            ProvisionError::RouteRegistration { .. } => ProvisionStep::RegisterRoutes,
            ProvisionError::Deployment { .. } => ProvisionStep::Deploy,
        }
    }

    /// The stage of the run, if the input got far enough to name one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProvisionError::InvalidStage(_) => None,
            ProvisionError::SecretResolution { stage, .. }
            | ProvisionError::ResourceCreation { stage, .. }
            | ProvisionError::RouteRegistration { stage, .. }
            | ProvisionError::Deployment { stage, .. } => Some(*stage),
        }
    }
}

/// The usage plan could not be attached. Not fatal: the API is deployed and
/// serving, only unthrottled. Surfaced as an alert for manual remediation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{stage}] usage plan '{plan}' not attached to deployment {deployment_id}: API is live but unthrottled")]
pub struct UsagePlanAttachmentError {
    pub stage: Stage,
    pub plan: String,
    pub deployment_id: String,
    #[source]
    pub source: ProviderError,
}
