//! # Provisioning Orchestrator
//!
//! Runs the fixed provisioning sequence for one stage:
//!
//! 1. validate the stage and resolve its [`StageConfig`]
//! 2. resolve every secret the routes reference
//! 3. create (or update) the storage bucket
//! 4. create the gateway on the stage's domain and certificate
//! 5. register every route
//! 6. deploy the gateway
//! 7. attach the usage plan to the deployed stage
//!
//! Each step takes the previous step's output as its input. Deployment needs a
//! [`RoutedGateway`], which only exists once every route registered, and the
//! usage plan needs the [`DeployedStage`] returned by deployment. Steps 1 and 2
//! have no side effects, so a bad stage or a missing secret aborts before the
//! provider sees a single call.
//!
//! Any failure up to and including deployment aborts the run with a
//! [`ProvisionError`]. There is no rollback: resources already committed by
//! the provider stay as they are and a re-run relies on the provider's
//! create-or-update behavior. A usage plan failure is not fatal; the run
//! returns [`ProvisionedResources`] with [`UsagePlanStatus::Unthrottled`].
//!
//! Runs against the same stage must not overlap. Nothing here enforces that.

mod error;
mod outcome;

pub use error::*;
pub use outcome::*;

use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::provider::{
    AccessLogConfig, BucketHandle, CloudProvider, DeployedStage, DomainBinding, GatewayHandle,
    GatewaySpec, ResolvedEnvironment, RouteBinding,
};
use crate::routes::{EnvValue, RouteDefinition, RouteTable};
use crate::secrets::{SecretStore, SecretValue, SecretsError};
use crate::stage::{StageConfig, StageResolver};
use crate::topology::Topology;

/// Secret values resolved for one run, keyed by secret name.
struct ResolvedSecrets(BTreeMap<String, SecretValue>);

/// A gateway on which every route in the table registered successfully.
pub struct RoutedGateway {
    gateway: GatewayHandle,
    routes: usize,
}

impl RoutedGateway {
    pub fn gateway(&self) -> &GatewayHandle {
        &self.gateway
    }

    pub fn route_count(&self) -> usize {
        self.routes
    }
}

/// Drives a [`CloudProvider`] through one stage's provisioning sequence.
pub struct ProvisioningOrchestrator<P, S> {
    provider: P,
    secrets: S,
    routes: RouteTable,
    resolver: StageResolver,
    topology: Topology,
}

impl<P: CloudProvider, S: SecretStore> ProvisioningOrchestrator<P, S> {
    pub fn new(provider: P, secrets: S, routes: RouteTable) -> Self {
        Self {
            provider,
            secrets,
            routes,
            resolver: StageResolver::standard(),
            topology: Topology::standard(),
        }
    }

    pub fn with_resolver(mut self, resolver: StageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Provisions the stage named by `stage_input`.
    #[instrument(name = "provision", skip_all, fields(stage = stage_input))]
    pub async fn run(&self, stage_input: &str) -> Result<ProvisionedResources, ProvisionError> {
        let config = self.resolver.resolve(stage_input)?;
        info!(
            domain = %config.domain_name,
            profile = %config.provider_profile,
            protected = config.is_protected,
            routes = self.routes.len(),
            "Provisioning stage"
        );

        let secrets = self.resolve_secrets(&config).await?;
        let bucket = self.create_bucket(&config).await?;
        let gateway = self.create_gateway(&config).await?;
        let routed = self.register_routes(&config, gateway, &secrets).await?;
        let deployed = self.deploy(&config, routed).await?;

        let usage_plan = match self.attach_usage_plan(&config, &deployed).await {
            Ok(status) => status,
            Err(err) => {
                warn!(alert = true, error = %err, "Usage plan attachment failed");
                UsagePlanStatus::from(&err)
            }
        };

        let resources = ProvisionedResources::new(
            config.stage,
            bucket.name,
            deployed.url,
            usage_plan,
            self.routes.any_requires_api_key(),
        );
        if resources.api_key_binding == ApiKeyBinding::PendingManual {
            warn!(
                plan = %self.topology.usage_plan.name,
                "API keys must be bound to the usage plan manually before callers can use the API"
            );
        }
        info!(
            bucket = %resources.bucket_identifier,
            url = %resources.gateway_url,
            throttled = resources.is_throttled(),
            "Provisioning complete"
        );
        Ok(resources)
    }

    async fn resolve_secrets(&self, config: &StageConfig) -> Result<ResolvedSecrets, ProvisionError> {
        let mut values = BTreeMap::new();
        for name in self.routes.secret_names() {
            let value = self
                .secrets
                .resolve(name)
                .await
                .map_err(|source| ProvisionError::SecretResolution {
                    stage: config.stage,
                    name: name.to_string(),
                    source,
                })?;
            values.insert(name.to_string(), value);
        }
        debug!(count = values.len(), "Secrets resolved");
        Ok(ResolvedSecrets(values))
    }

    async fn create_bucket(&self, config: &StageConfig) -> Result<BucketHandle, ProvisionError> {
        let name = self.topology.bucket_name_for(config.stage);
        let bucket = self
            .provider
            .create_bucket(&name, &config.cors_policy)
            .await
            .map_err(|source| ProvisionError::ResourceCreation {
                stage: config.stage,
                resource: ResourceKind::Bucket,
                name: name.clone(),
                source,
            })?;
        info!(bucket = %bucket.name, cors = !config.cors_policy.is_empty(), "Bucket ready");
        Ok(bucket)
    }

    async fn create_gateway(&self, config: &StageConfig) -> Result<GatewayHandle, ProvisionError> {
        let spec = GatewaySpec {
            name: self.topology.gateway_name.clone(),
            stage: config.stage,
            domain: DomainBinding {
                name: config.domain_name.clone(),
                certificate_arn: config.certificate_arn.clone(),
                manage_dns: false,
            },
            endpoint: self.topology.endpoint,
            access_log: AccessLogConfig {
                retention: self.topology.access_log_retention,
            },
        };
        let gateway = self
            .provider
            .create_gateway(&spec)
            .await
            .map_err(|source| ProvisionError::ResourceCreation {
                stage: config.stage,
                resource: ResourceKind::Gateway,
                name: spec.name.clone(),
                source,
            })?;
        info!(gateway_id = %gateway.id, domain = %gateway.domain, "Gateway created");
        Ok(gateway)
    }

    async fn register_routes(
        &self,
        config: &StageConfig,
        gateway: GatewayHandle,
        secrets: &ResolvedSecrets,
    ) -> Result<RoutedGateway, ProvisionError> {
        let mut registered = 0;
        for route in self.routes.routes() {
            let binding = RouteBinding::new(route, environment_for(config, route, secrets)?);
            self.provider
                .register_route(&gateway, &binding)
                .await
                .map_err(|source| ProvisionError::RouteRegistration {
                    stage: config.stage,
                    gateway_id: gateway.id.clone(),
                    route: route.key.clone(),
                    registered,
                    source,
                })?;
            registered += 1;
            debug!(route = %route.key, api_key = route.requires_api_key, "Route registered");
        }
        info!(gateway_id = %gateway.id, routes = registered, "Routes registered");
        Ok(RoutedGateway {
            gateway,
            routes: registered,
        })
    }

    async fn deploy(&self, config: &StageConfig, routed: RoutedGateway) -> Result<DeployedStage, ProvisionError> {
        let deployed = self
            .provider
            .deploy(&routed.gateway)
            .await
            .map_err(|source| ProvisionError::Deployment {
                stage: config.stage,
                gateway_id: routed.gateway.id.clone(),
                source,
            })?;
        info!(
            deployment_id = %deployed.deployment_id,
            url = %deployed.url,
            routes = routed.routes,
            "Gateway deployed"
        );
        Ok(deployed)
    }

    async fn attach_usage_plan(
        &self,
        config: &StageConfig,
        deployed: &DeployedStage,
    ) -> Result<UsagePlanStatus, UsagePlanAttachmentError> {
        let plan = &self.topology.usage_plan;
        let handle = self
            .provider
            .attach_usage_plan(deployed, plan)
            .await
            .map_err(|source| UsagePlanAttachmentError {
                stage: config.stage,
                plan: plan.name.clone(),
                deployment_id: deployed.deployment_id.clone(),
                source,
            })?;
        info!(
            plan = %handle.name,
            rate = plan.throttle.rate_per_second,
            burst = plan.throttle.burst,
            "Usage plan attached"
        );
        Ok(UsagePlanStatus::Attached {
            plan_id: handle.id,
            name: handle.name,
        })
    }
}

/// Fills a route's environment from literals and the run's resolved secrets.
fn environment_for(
    config: &StageConfig,
    route: &RouteDefinition,
    secrets: &ResolvedSecrets,
) -> Result<ResolvedEnvironment, ProvisionError> {
    let mut values = BTreeMap::new();
    for (var, value) in &route.environment {
        let resolved = match value {
            EnvValue::Literal(literal) => literal.clone(),
            EnvValue::Secret(name) => secrets
                .0
                .get(name)
                .map(|secret| secret.expose().to_string())
                .ok_or_else(|| ProvisionError::SecretResolution {
                    stage: config.stage,
                    name: name.clone(),
                    source: SecretsError::NotFound { name: name.clone() },
                })?,
        };
        values.insert(var.clone(), resolved);
    }
    Ok(ResolvedEnvironment::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockProvider, ProviderCall};
    use crate::provider::ProviderError;
    use crate::routes::{ApiRoute, HandlerRef, HttpMethod, ResourceLimits, RouteKey};
    use crate::secrets::StaticSecretStore;
    use crate::stage::Stage;
    use std::time::Duration;

    fn route(path: &str, requires_api_key: bool) -> RouteDefinition {
        let definition = RouteDefinition::new(
            RouteKey::new(HttpMethod::Post, path),
            HandlerRef {
                name: path.trim_start_matches('/').replace('/', "-"),
                runtime: "python3.11".to_string(),
                entry_point: "api.handler".to_string(),
                container: true,
            },
            ResourceLimits {
                timeout: Duration::from_secs(120),
                memory_mb: 256,
            },
        )
        .with_secret("POSTGRES_URL", "POSTGRES_URL")
        .with_literal("STAGE_HINT", "fixed");
        if requires_api_key {
            definition.with_api_key()
        } else {
            definition
        }
    }

    fn table(paths: &[&str]) -> RouteTable {
        RouteTable::new(
            paths
                .iter()
                .enumerate()
                .map(|(i, path)| ApiRoute::new(format!("api{i}"), "v1", route(path, true)))
                .collect(),
        )
        .unwrap()
    }

    fn secrets() -> StaticSecretStore {
        StaticSecretStore::new().with("POSTGRES_URL", "postgres://calc")
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let mock = MockProvider::new();
        mock.expect_successful_run("bucket", "staging.api.example", 3);

        let orchestrator =
            ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a", "/v1/b", "/v1/c"]));
        let resources = orchestrator.run("staging").await.unwrap();

        mock.verify();
        assert_eq!(
            mock.call_names(),
            vec![
                "create_bucket",
                "create_gateway",
                "register_route",
                "register_route",
                "register_route",
                "deploy",
                "attach_usage_plan",
            ]
        );
        assert_eq!(resources.gateway_url, "https://staging.api.example");
        assert!(resources.is_throttled());
    }

    #[tokio::test]
    async fn test_resolved_environment_is_passed_to_registration() {
        let mock = MockProvider::new();
        mock.expect_successful_run("bucket", "staging.api.example", 1);

        let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a"]));
        orchestrator.run("staging").await.unwrap();

        let registered = mock
            .calls()
            .into_iter()
            .find_map(|call| match call {
                ProviderCall::RegisterRoute { env_vars, .. } => Some(env_vars),
                _ => None,
            })
            .unwrap();
        assert_eq!(registered, vec!["POSTGRES_URL", "STAGE_HINT"]);
    }

    #[tokio::test]
    async fn test_missing_secret_aborts_before_side_effects() {
        let mock = MockProvider::new();
        let orchestrator =
            ProvisioningOrchestrator::new(mock.clone(), StaticSecretStore::new(), table(&["/v1/a"]));

        let err = orchestrator.run("staging").await.unwrap_err();
        assert_eq!(err.step(), ProvisionStep::ResolveSecrets);
        assert_eq!(err.stage(), Some(Stage::Staging));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bucket_failure_stops_run() {
        let mock = MockProvider::new();
        mock.expect_create_bucket()
            .return_err(ProviderError::Rejected("bucket quota".to_string()));

        let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a"]));
        let err = orchestrator.run("production").await.unwrap_err();

        assert_eq!(err.step(), ProvisionStep::CreateBucket);
        assert_eq!(mock.call_names(), vec!["create_bucket"]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_gateway_failure_stops_run() {
        let mock = MockProvider::new();
        mock.expect_create_bucket().return_ok(BucketHandle {
            name: "bucket".to_string(),
        });
        mock.expect_create_gateway()
            .return_err(ProviderError::Conflict("domain in use".to_string()));

        let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a"]));
        let err = orchestrator.run("staging").await.unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::ResourceCreation {
                resource: ResourceKind::Gateway,
                ..
            }
        ));
        assert_eq!(mock.count("register_route"), 0);
        mock.verify();
    }

    #[tokio::test]
    async fn test_deploy_failure_skips_usage_plan() {
        let mock = MockProvider::new();
        mock.expect_create_bucket().return_ok(BucketHandle {
            name: "bucket".to_string(),
        });
        mock.expect_create_gateway().return_ok(GatewayHandle {
            id: "gw-1".to_string(),
            name: "g".to_string(),
            domain: "api.example".to_string(),
        });
        mock.expect_register_route().return_ok(());
        mock.expect_deploy()
            .return_err(ProviderError::Rejected("throttled".to_string()));

        let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a"]));
        let err = orchestrator.run("production").await.unwrap_err();

        assert_eq!(err.step(), ProvisionStep::Deploy);
        assert_eq!(mock.count("attach_usage_plan"), 0);
        mock.verify();
    }

    #[tokio::test]
    async fn test_usage_plan_failure_is_recoverable() {
        let mock = MockProvider::new();
        mock.expect_create_bucket().return_ok(BucketHandle {
            name: "bucket".to_string(),
        });
        mock.expect_create_gateway().return_ok(GatewayHandle {
            id: "gw-1".to_string(),
            name: "g".to_string(),
            domain: "api.example".to_string(),
        });
        mock.expect_register_route().return_ok(());
        mock.expect_deploy().return_ok(DeployedStage {
            gateway_id: "gw-1".to_string(),
            deployment_id: "dep-1".to_string(),
            stage_name: "production".to_string(),
            url: "https://api.example".to_string(),
        });
        mock.expect_attach_usage_plan()
            .return_err(ProviderError::Rejected("plan limit".to_string()));

        let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a"]));
        let resources = orchestrator.run("production").await.unwrap();

        assert_eq!(resources.gateway_url, "https://api.example");
        assert!(!resources.is_throttled());
        assert!(!resources.is_caller_ready());
        assert!(matches!(
            resources.usage_plan,
            UsagePlanStatus::Unthrottled { ref reason, .. } if reason.contains("plan limit")
        ));
        mock.verify();
    }

    #[tokio::test]
    async fn test_bucket_uses_stage_scoped_name_and_cors() {
        let mock = MockProvider::new();
        mock.expect_successful_run("calc-backend-staging-calc", "staging.api.example", 1);

        let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets(), table(&["/v1/a"]));
        orchestrator.run("staging").await.unwrap();

        match &mock.calls()[0] {
            ProviderCall::CreateBucket { name, cors } => {
                assert_eq!(name, "calc-backend-staging-calc");
                assert!(!cors.is_empty());
            }
            other => panic!("unexpected first call: {other:?}"),
        }
        match &mock.calls()[1] {
            ProviderCall::CreateGateway { spec } => {
                assert_eq!(spec.domain.name, "staging.api.example");
                assert!(!spec.domain.manage_dns);
                assert_eq!(spec.access_log.retention, Topology::standard().access_log_retention);
            }
            other => panic!("unexpected second call: {other:?}"),
        }
    }
}
