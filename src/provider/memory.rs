//! # In-Memory Cloud
//!
//! A [`CloudProvider`] that keeps every resource in memory. The state lives in
//! an [`InMemoryCloud`] actor running in its own Tokio task; the cheap,
//! cloneable [`InMemoryProvider`] client talks to it over a channel.
//!
//! The actor processes one request at a time, so there is never more than one
//! in-flight mutation, and it needs no locks around its state.
//!
//! It enforces the same preconditions a real gateway service does:
//! - a route identity can be registered only once per gateway,
//! - a gateway without routes cannot be deployed,
//! - usage plans attach only to a stage that was actually deployed.
//!
//! ```rust,ignore
//! let (cloud, provider) = memory::new(32);
//! let handle = tokio::spawn(cloud.run());
//! // ... hand `provider` to the orchestrator ...
//! drop(provider);
//! handle.await?;
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{
    BucketHandle, CloudProvider, DeployedStage, GatewayHandle, GatewaySpec, ProviderError,
    RouteBinding, UsagePlanHandle,
};
use crate::routes::RouteKey;
use crate::stage::CorsPolicy;
use crate::topology::{Throttle, UsagePlan};

type Response<T> = oneshot::Sender<Result<T, ProviderError>>;

/// Requests understood by the [`InMemoryCloud`] actor.
#[derive(Debug)]
pub enum CloudRequest {
    CreateBucket {
        name: String,
        cors: CorsPolicy,
        respond_to: Response<BucketHandle>,
    },
    CreateGateway {
        spec: GatewaySpec,
        respond_to: Response<GatewayHandle>,
    },
    RegisterRoute {
        gateway_id: String,
        route: RouteBinding,
        respond_to: Response<()>,
    },
    Deploy {
        gateway_id: String,
        respond_to: Response<DeployedStage>,
    },
    AttachUsagePlan {
        stage: DeployedStage,
        plan: UsagePlan,
        respond_to: Response<UsagePlanHandle>,
    },
    Snapshot {
        respond_to: oneshot::Sender<CloudSnapshot>,
    },
}

/// Point-in-time view of everything the in-memory cloud holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudSnapshot {
    pub buckets: BTreeMap<String, CorsPolicy>,
    pub gateways: Vec<GatewaySnapshot>,
    pub usage_plans: Vec<UsagePlanRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySnapshot {
    pub id: String,
    pub spec: GatewaySpec,
    /// Registered routes, in registration order.
    pub routes: Vec<RouteKey>,
    /// Routes visible on the live stage as of the latest deployment.
    pub deployed_routes: Vec<RouteKey>,
    pub protected_routes: Vec<RouteKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsagePlanRecord {
    pub id: String,
    pub name: String,
    pub throttle: Throttle,
    pub gateway_id: String,
    pub stage_name: String,
}

struct GatewayState {
    spec: GatewaySpec,
    routes: Vec<RouteBinding>,
    deployed_routes: Vec<RouteKey>,
}

/// The actor half: owns the cloud state and the request receiver.
pub struct InMemoryCloud {
    receiver: mpsc::Receiver<CloudRequest>,
    buckets: BTreeMap<String, CorsPolicy>,
    gateways: HashMap<String, GatewayState>,
    gateway_order: Vec<String>,
    deployments: HashMap<String, DeployedStage>,
    usage_plans: Vec<UsagePlanRecord>,
    next_id: u64,
}

/// Creates the in-memory cloud actor and its client.
pub fn new(buffer_size: usize) -> (InMemoryCloud, InMemoryProvider) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let cloud = InMemoryCloud {
        receiver,
        buckets: BTreeMap::new(),
        gateways: HashMap::new(),
        gateway_order: Vec::new(),
        deployments: HashMap::new(),
        usage_plans: Vec::new(),
        next_id: 1,
    };
    (cloud, InMemoryProvider { sender })
}

impl InMemoryCloud {
    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("In-memory cloud started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                CloudRequest::CreateBucket { name, cors, respond_to } => {
                    let _ = respond_to.send(Ok(self.create_bucket(name, cors)));
                }
                CloudRequest::CreateGateway { spec, respond_to } => {
                    let _ = respond_to.send(Ok(self.create_gateway(spec)));
                }
                CloudRequest::RegisterRoute {
                    gateway_id,
                    route,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.register_route(&gateway_id, route));
                }
                CloudRequest::Deploy { gateway_id, respond_to } => {
                    let _ = respond_to.send(self.deploy(&gateway_id));
                }
                CloudRequest::AttachUsagePlan {
                    stage,
                    plan,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.attach_usage_plan(&stage, plan));
                }
                CloudRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.snapshot());
                }
            }
        }

        info!(
            buckets = self.buckets.len(),
            gateways = self.gateways.len(),
            usage_plans = self.usage_plans.len(),
            "In-memory cloud shutdown"
        );
    }

    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn create_bucket(&mut self, name: String, cors: CorsPolicy) -> BucketHandle {
        let updated = self.buckets.insert(name.clone(), cors).is_some();
        info!(bucket = %name, updated, "Bucket ready");
        BucketHandle { name }
    }

    fn create_gateway(&mut self, spec: GatewaySpec) -> GatewayHandle {
        let id = self.next_id("gw");
        let handle = GatewayHandle {
            id: id.clone(),
            name: spec.name.clone(),
            domain: spec.domain.name.clone(),
        };
        info!(gateway_id = %id, domain = %spec.domain.name, "Gateway created");
        self.gateways.insert(
            id.clone(),
            GatewayState {
                spec,
                routes: Vec::new(),
                deployed_routes: Vec::new(),
            },
        );
        self.gateway_order.push(id);
        handle
    }

    fn register_route(&mut self, gateway_id: &str, route: RouteBinding) -> Result<(), ProviderError> {
        let gateway = self.gateways.get_mut(gateway_id).ok_or_else(|| ProviderError::NotFound {
            kind: "gateway",
            id: gateway_id.to_string(),
        })?;

        if gateway.routes.iter().any(|existing| existing.key == route.key) {
            warn!(gateway_id, route = %route.key, "Route already registered");
            return Err(ProviderError::Conflict(format!(
                "route {} already registered on {gateway_id}",
                route.key
            )));
        }

        debug!(gateway_id, route = %route.key, env = ?route.environment, "Route registered");
        gateway.routes.push(route);
        Ok(())
    }

    fn deploy(&mut self, gateway_id: &str) -> Result<DeployedStage, ProviderError> {
        let deployment_id = self.next_id("dep");
        let gateway = self.gateways.get_mut(gateway_id).ok_or_else(|| ProviderError::NotFound {
            kind: "gateway",
            id: gateway_id.to_string(),
        })?;

        if gateway.routes.is_empty() {
            return Err(ProviderError::Rejected(format!(
                "gateway {gateway_id} has no routes to deploy"
            )));
        }

        gateway.deployed_routes = gateway.routes.iter().map(|r| r.key.clone()).collect();
        let stage = DeployedStage {
            gateway_id: gateway_id.to_string(),
            deployment_id: deployment_id.clone(),
            stage_name: gateway.spec.stage.to_string(),
            url: format!("https://{}", gateway.spec.domain.name),
        };
        info!(gateway_id, %deployment_id, routes = gateway.deployed_routes.len(), "Gateway deployed");
        self.deployments.insert(deployment_id, stage.clone());
        Ok(stage)
    }

    fn attach_usage_plan(&mut self, stage: &DeployedStage, plan: UsagePlan) -> Result<UsagePlanHandle, ProviderError> {
        if self.deployments.get(&stage.deployment_id) != Some(stage) {
            return Err(ProviderError::NotFound {
                kind: "deployed stage",
                id: stage.deployment_id.clone(),
            });
        }

        let id = self.next_id("plan");
        info!(plan = %plan.name, %id, gateway_id = %stage.gateway_id, "Usage plan attached");
        self.usage_plans.push(UsagePlanRecord {
            id: id.clone(),
            name: plan.name.clone(),
            throttle: plan.throttle,
            gateway_id: stage.gateway_id.clone(),
            stage_name: stage.stage_name.clone(),
        });
        Ok(UsagePlanHandle { id, name: plan.name })
    }

    fn snapshot(&self) -> CloudSnapshot {
        let gateways = self
            .gateway_order
            .iter()
            .filter_map(|id| self.gateways.get(id).map(|state| (id, state)))
            .map(|(id, state)| GatewaySnapshot {
                id: id.clone(),
                spec: state.spec.clone(),
                routes: state.routes.iter().map(|r| r.key.clone()).collect(),
                deployed_routes: state.deployed_routes.clone(),
                protected_routes: state
                    .routes
                    .iter()
                    .filter(|r| r.requires_api_key)
                    .map(|r| r.key.clone())
                    .collect(),
            })
            .collect();

        CloudSnapshot {
            buckets: self.buckets.clone(),
            gateways,
            usage_plans: self.usage_plans.clone(),
        }
    }
}

/// The client half of the in-memory cloud.
#[derive(Clone)]
pub struct InMemoryProvider {
    sender: mpsc::Sender<CloudRequest>,
}

impl InMemoryProvider {
    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> CloudRequest,
    ) -> Result<T, ProviderError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| ProviderError::Closed)?;
        response.await.map_err(|_| ProviderError::Dropped)?
    }

    pub async fn snapshot(&self) -> Result<CloudSnapshot, ProviderError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CloudRequest::Snapshot { respond_to })
            .await
            .map_err(|_| ProviderError::Closed)?;
        response.await.map_err(|_| ProviderError::Dropped)
    }
}

#[async_trait]
impl CloudProvider for InMemoryProvider {
    async fn create_bucket(&self, name: &str, cors: &CorsPolicy) -> Result<BucketHandle, ProviderError> {
        let name = name.to_string();
        let cors = cors.clone();
        self.request(|respond_to| CloudRequest::CreateBucket { name, cors, respond_to })
            .await
    }

    async fn create_gateway(&self, spec: &GatewaySpec) -> Result<GatewayHandle, ProviderError> {
        let spec = spec.clone();
        self.request(|respond_to| CloudRequest::CreateGateway { spec, respond_to })
            .await
    }

    async fn register_route(&self, gateway: &GatewayHandle, route: &RouteBinding) -> Result<(), ProviderError> {
        let gateway_id = gateway.id.clone();
        let route = route.clone();
        self.request(|respond_to| CloudRequest::RegisterRoute {
            gateway_id,
            route,
            respond_to,
        })
        .await
    }

    async fn deploy(&self, gateway: &GatewayHandle) -> Result<DeployedStage, ProviderError> {
        let gateway_id = gateway.id.clone();
        self.request(|respond_to| CloudRequest::Deploy { gateway_id, respond_to })
            .await
    }

    async fn attach_usage_plan(
        &self,
        stage: &DeployedStage,
        plan: &UsagePlan,
    ) -> Result<UsagePlanHandle, ProviderError> {
        let stage = stage.clone();
        let plan = plan.clone();
        self.request(|respond_to| CloudRequest::AttachUsagePlan {
            stage,
            plan,
            respond_to,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AccessLogConfig, DomainBinding, ResolvedEnvironment};
    use crate::routes::{HandlerRef, HttpMethod, ResourceLimits};
    use crate::stage::Stage;
    use crate::topology::EndpointType;
    use std::time::Duration;

    fn spec() -> GatewaySpec {
        GatewaySpec {
            name: "TestGateway".to_string(),
            stage: Stage::Staging,
            domain: DomainBinding {
                name: "staging.api.example".to_string(),
                certificate_arn: "arn:cert".to_string(),
                manage_dns: false,
            },
            endpoint: EndpointType::Regional,
            access_log: AccessLogConfig {
                retention: Duration::from_secs(60),
            },
        }
    }

    fn binding(path: &str) -> RouteBinding {
        RouteBinding {
            key: RouteKey::new(HttpMethod::Post, path),
            handler: HandlerRef {
                name: "h".to_string(),
                runtime: "python3.11".to_string(),
                entry_point: "api.handler".to_string(),
                container: true,
            },
            limits: ResourceLimits {
                timeout: Duration::from_secs(10),
                memory_mb: 128,
            },
            requires_api_key: true,
            environment: ResolvedEnvironment::default(),
        }
    }

    fn plan() -> UsagePlan {
        UsagePlan {
            name: "plan".to_string(),
            throttle: Throttle {
                rate_per_second: 10,
                burst: 20,
            },
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (cloud, provider) = new(8);
        let handle = tokio::spawn(cloud.run());

        let bucket = provider.create_bucket("b", &CorsPolicy::none()).await.unwrap();
        assert_eq!(bucket.name, "b");

        let gateway = provider.create_gateway(&spec()).await.unwrap();
        provider.register_route(&gateway, &binding("/v1/a")).await.unwrap();
        provider.register_route(&gateway, &binding("/v1/b")).await.unwrap();

        let stage = provider.deploy(&gateway).await.unwrap();
        assert_eq!(stage.url, "https://staging.api.example");
        assert_eq!(stage.stage_name, "staging");

        let plan_handle = provider.attach_usage_plan(&stage, &plan()).await.unwrap();
        assert_eq!(plan_handle.name, "plan");

        let snapshot = provider.snapshot().await.unwrap();
        assert_eq!(snapshot.buckets.len(), 1);
        assert_eq!(snapshot.gateways[0].deployed_routes.len(), 2);
        assert_eq!(snapshot.gateways[0].protected_routes.len(), 2);
        assert_eq!(snapshot.usage_plans[0].gateway_id, gateway.id);

        drop(provider);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_duplicate_route() {
        let (cloud, provider) = new(8);
        tokio::spawn(cloud.run());

        let gateway = provider.create_gateway(&spec()).await.unwrap();
        provider.register_route(&gateway, &binding("/v1/a")).await.unwrap();
        let err = provider.register_route(&gateway, &binding("/v1/a")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deploy_requires_routes() {
        let (cloud, provider) = new(8);
        tokio::spawn(cloud.run());

        let gateway = provider.create_gateway(&spec()).await.unwrap();
        let err = provider.deploy(&gateway).await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_usage_plan_requires_deployed_stage() {
        let (cloud, provider) = new(8);
        tokio::spawn(cloud.run());

        let forged = DeployedStage {
            gateway_id: "gw-404".to_string(),
            deployment_id: "dep-404".to_string(),
            stage_name: "staging".to_string(),
            url: "https://nowhere".to_string(),
        };
        let err = provider.attach_usage_plan(&forged, &plan()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bucket_create_is_create_or_update() {
        let (cloud, provider) = new(8);
        tokio::spawn(cloud.run());

        provider.create_bucket("b", &CorsPolicy::none()).await.unwrap();
        provider.create_bucket("b", &CorsPolicy::none()).await.unwrap();
        assert_eq!(provider.snapshot().await.unwrap().buckets.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_cloud_reports_closed() {
        let (cloud, provider) = new(8);
        drop(cloud);
        let err = provider.create_bucket("b", &CorsPolicy::none()).await.unwrap_err();
        assert_eq!(err, ProviderError::Closed);
    }
}
