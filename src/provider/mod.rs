//! Cloud resource provider collaborator.
//!
//! [`CloudProvider`] is the opaque side-effecting interface the orchestrator
//! drives. Each call either completes or fails; any waiting for resources to
//! become ready happens behind it.
//!
//! The handle types encode the provisioning order as data: a
//! [`DeployedStage`] can only come from [`CloudProvider::deploy`], and a
//! usage plan can only be attached to a `DeployedStage`.
//!
//! Two implementations ship with the crate:
//! - [`memory`]: an in-memory cloud running as a Tokio actor, for dry runs.
//! - [`mock`]: an expectation-driven mock with a call log, for tests.

pub mod error;
pub mod memory;
pub mod mock;

pub use error::*;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::routes::{HandlerRef, ResourceLimits, RouteDefinition, RouteKey};
use crate::stage::{CorsPolicy, Stage};
use crate::topology::{EndpointType, UsagePlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketHandle {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayHandle {
    pub id: String,
    pub name: String,
    pub domain: String,
}

/// A published gateway stage. Only [`CloudProvider::deploy`] produces one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedStage {
    pub gateway_id: String,
    pub deployment_id: String,
    pub stage_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsagePlanHandle {
    pub id: String,
    pub name: String,
}

/// Custom domain binding for the gateway. Certificates are supplied, never
/// issued here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainBinding {
    pub name: String,
    pub certificate_arn: String,
    /// Whether the provider should manage DNS records for the domain.
    pub manage_dns: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessLogConfig {
    pub retention: Duration,
}

/// Everything needed to create the gateway resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySpec {
    pub name: String,
    pub stage: Stage,
    pub domain: DomainBinding,
    pub endpoint: EndpointType,
    pub access_log: AccessLogConfig,
}

/// Handler environment with secret references replaced by their values.
///
/// `Debug` lists variable names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedEnvironment(BTreeMap<String, String>);

impl ResolvedEnvironment {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self(values)
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(String::as_str)
    }

    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ResolvedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// A route ready to register: its definition with a resolved environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    pub key: RouteKey,
    pub handler: HandlerRef,
    pub limits: ResourceLimits,
    pub requires_api_key: bool,
    pub environment: ResolvedEnvironment,
}

impl RouteBinding {
    pub fn new(definition: &RouteDefinition, environment: ResolvedEnvironment) -> Self {
        Self {
            key: definition.key.clone(),
            handler: definition.handler.clone(),
            limits: definition.limits,
            requires_api_key: definition.requires_api_key,
            environment,
        }
    }
}

/// Side-effecting resource creation API of the cloud account.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Creates the bucket, or updates it if it already exists.
    async fn create_bucket(&self, name: &str, cors: &CorsPolicy) -> Result<BucketHandle, ProviderError>;

    /// Creates a gateway with no routes and no deployment.
    async fn create_gateway(&self, spec: &GatewaySpec) -> Result<GatewayHandle, ProviderError>;

    async fn register_route(&self, gateway: &GatewayHandle, route: &RouteBinding) -> Result<(), ProviderError>;

    /// Publishes the gateway's registered routes to a live stage.
    async fn deploy(&self, gateway: &GatewayHandle) -> Result<DeployedStage, ProviderError>;

    async fn attach_usage_plan(
        &self,
        stage: &DeployedStage,
        plan: &UsagePlan,
    ) -> Result<UsagePlanHandle, ProviderError>;
}

#[async_trait]
impl<P: CloudProvider + ?Sized> CloudProvider for std::sync::Arc<P> {
    async fn create_bucket(&self, name: &str, cors: &CorsPolicy) -> Result<BucketHandle, ProviderError> {
        (**self).create_bucket(name, cors).await
    }

    async fn create_gateway(&self, spec: &GatewaySpec) -> Result<GatewayHandle, ProviderError> {
        (**self).create_gateway(spec).await
    }

    async fn register_route(&self, gateway: &GatewayHandle, route: &RouteBinding) -> Result<(), ProviderError> {
        (**self).register_route(gateway, route).await
    }

    async fn deploy(&self, gateway: &GatewayHandle) -> Result<DeployedStage, ProviderError> {
        (**self).deploy(gateway).await
    }

    async fn attach_usage_plan(
        &self,
        stage: &DeployedStage,
        plan: &UsagePlan,
    ) -> Result<UsagePlanHandle, ProviderError> {
        (**self).attach_usage_plan(stage, plan).await
    }
}
