//! # Mock Provider
//!
//! An expectation-driven [`CloudProvider`] for testing the orchestrator
//! without any cloud.
//!
//! Queue the responses you expect, in order, then hand a clone of the mock to
//! the code under test. Every call is recorded in a call log, so ordering
//! properties can be asserted after the run. A call that arrives when the next
//! queued expectation is for a different operation (or when nothing is
//! queued) panics.
//!
//! ```rust,ignore
//! let mock = MockProvider::new();
//! mock.expect_create_bucket().return_ok(BucketHandle { name: "b".into() });
//! mock.expect_create_gateway().return_err(ProviderError::Rejected("quota".into()));
//!
//! let orchestrator = ProvisioningOrchestrator::new(mock.clone(), secrets, routes);
//! assert!(orchestrator.run("staging").await.is_err());
//!
//! mock.verify();
//! assert_eq!(mock.calls().len(), 2);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{
    BucketHandle, CloudProvider, DeployedStage, GatewayHandle, GatewaySpec, ProviderError,
    RouteBinding, UsagePlanHandle,
};
use crate::routes::RouteKey;
use crate::stage::CorsPolicy;
use crate::topology::UsagePlan;

/// A provider call as recorded by [`MockProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateBucket { name: String, cors: CorsPolicy },
    CreateGateway { spec: GatewaySpec },
    RegisterRoute {
        gateway_id: String,
        key: RouteKey,
        requires_api_key: bool,
        env_vars: Vec<String>,
    },
    Deploy { gateway_id: String },
    AttachUsagePlan { deployment_id: String, plan: UsagePlan },
}

impl ProviderCall {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderCall::CreateBucket { .. } => "create_bucket",
            ProviderCall::CreateGateway { .. } => "create_gateway",
            ProviderCall::RegisterRoute { .. } => "register_route",
            ProviderCall::Deploy { .. } => "deploy",
            ProviderCall::AttachUsagePlan { .. } => "attach_usage_plan",
        }
    }
}

enum Expectation {
    CreateBucket(Result<BucketHandle, ProviderError>),
    CreateGateway(Result<GatewayHandle, ProviderError>),
    RegisterRoute(Result<(), ProviderError>),
    Deploy(Result<DeployedStage, ProviderError>),
    AttachUsagePlan(Result<UsagePlanHandle, ProviderError>),
}

impl Expectation {
    fn name(&self) -> &'static str {
        match self {
            Expectation::CreateBucket(_) => "create_bucket",
            Expectation::CreateGateway(_) => "create_gateway",
            Expectation::RegisterRoute(_) => "register_route",
            Expectation::Deploy(_) => "deploy",
            Expectation::AttachUsagePlan(_) => "attach_usage_plan",
        }
    }
}

/// A mock cloud provider with expectation tracking and a call log.
///
/// Clones share the same expectations and log.
#[derive(Clone, Default)]
pub struct MockProvider {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_create_bucket(&self) -> ExpectationBuilder<BucketHandle> {
        ExpectationBuilder::new(self.expectations.clone(), Expectation::CreateBucket)
    }

    pub fn expect_create_gateway(&self) -> ExpectationBuilder<GatewayHandle> {
        ExpectationBuilder::new(self.expectations.clone(), Expectation::CreateGateway)
    }

    pub fn expect_register_route(&self) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(self.expectations.clone(), Expectation::RegisterRoute)
    }

    pub fn expect_deploy(&self) -> ExpectationBuilder<DeployedStage> {
        ExpectationBuilder::new(self.expectations.clone(), Expectation::Deploy)
    }

    pub fn expect_attach_usage_plan(&self) -> ExpectationBuilder<UsagePlanHandle> {
        ExpectationBuilder::new(self.expectations.clone(), Expectation::AttachUsagePlan)
    }

    /// Queues a fully successful run against a gateway on `domain` with
    /// `routes` route registrations.
    pub fn expect_successful_run(&self, bucket: &str, domain: &str, routes: usize) {
        self.expect_create_bucket().return_ok(BucketHandle {
            name: bucket.to_string(),
        });
        self.expect_create_gateway().return_ok(GatewayHandle {
            id: "gw-1".to_string(),
            name: "MockGateway".to_string(),
            domain: domain.to_string(),
        });
        for _ in 0..routes {
            self.expect_register_route().return_ok(());
        }
        self.expect_deploy().return_ok(DeployedStage {
            gateway_id: "gw-1".to_string(),
            deployment_id: "dep-1".to_string(),
            stage_name: "mock".to_string(),
            url: format!("https://{domain}"),
        });
        self.expect_attach_usage_plan().return_ok(UsagePlanHandle {
            id: "plan-1".to_string(),
            name: "mock-plan".to_string(),
        });
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of the calls received so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(ProviderCall::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.call_names().into_iter().filter(|n| *n == name).count()
    }

    /// Panics unless every queued expectation was consumed.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            let pending: Vec<&str> = exps.iter().map(Expectation::name).collect();
            panic!("Not all expectations were met. {} remaining: {:?}", exps.len(), pending);
        }
    }

    fn record(&self, call: ProviderCall) -> Expectation {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        match self.expectations.lock().unwrap().pop_front() {
            Some(expectation) => expectation,
            None => panic!("Unexpected call to {name}: no expectations queued"),
        }
    }
}

/// Builder returned by the `expect_*` methods.
pub struct ExpectationBuilder<T> {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    wrap: fn(Result<T, ProviderError>) -> Expectation,
}

impl<T> ExpectationBuilder<T> {
    fn new(
        expectations: Arc<Mutex<VecDeque<Expectation>>>,
        wrap: fn(Result<T, ProviderError>) -> Expectation,
    ) -> Self {
        Self { expectations, wrap }
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        self.expectations.lock().unwrap().push_back((self.wrap)(Ok(value)));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ProviderError) {
        self.expectations.lock().unwrap().push_back((self.wrap)(Err(error)));
    }
}

fn mismatch(call: &str, expectation: &Expectation) -> ! {
    panic!(
        "Expectation mismatch: got {call}, expected {}",
        expectation.name()
    )
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn create_bucket(&self, name: &str, cors: &CorsPolicy) -> Result<BucketHandle, ProviderError> {
        match self.record(ProviderCall::CreateBucket {
            name: name.to_string(),
            cors: cors.clone(),
        }) {
            Expectation::CreateBucket(response) => response,
            other => mismatch("create_bucket", &other),
        }
    }

    async fn create_gateway(&self, spec: &GatewaySpec) -> Result<GatewayHandle, ProviderError> {
        match self.record(ProviderCall::CreateGateway { spec: spec.clone() }) {
            Expectation::CreateGateway(response) => response,
            other => mismatch("create_gateway", &other),
        }
    }

    async fn register_route(&self, gateway: &GatewayHandle, route: &RouteBinding) -> Result<(), ProviderError> {
        match self.record(ProviderCall::RegisterRoute {
            gateway_id: gateway.id.clone(),
            key: route.key.clone(),
            requires_api_key: route.requires_api_key,
            env_vars: route.environment.vars().map(str::to_string).collect(),
        }) {
            Expectation::RegisterRoute(response) => response,
            other => mismatch("register_route", &other),
        }
    }

    async fn deploy(&self, gateway: &GatewayHandle) -> Result<DeployedStage, ProviderError> {
        match self.record(ProviderCall::Deploy {
            gateway_id: gateway.id.clone(),
        }) {
            Expectation::Deploy(response) => response,
            other => mismatch("deploy", &other),
        }
    }

    async fn attach_usage_plan(
        &self,
        stage: &DeployedStage,
        plan: &UsagePlan,
    ) -> Result<UsagePlanHandle, ProviderError> {
        match self.record(ProviderCall::AttachUsagePlan {
            deployment_id: stage.deployment_id.clone(),
            plan: plan.clone(),
        }) {
            Expectation::AttachUsagePlan(response) => response,
            other => mismatch("attach_usage_plan", &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_queued_responses() {
        let mock = MockProvider::new();
        mock.expect_create_bucket().return_ok(BucketHandle {
            name: "b".to_string(),
        });
        mock.expect_create_bucket()
            .return_err(ProviderError::Rejected("quota".to_string()));

        let first = mock.create_bucket("b", &CorsPolicy::none()).await;
        assert_eq!(first.unwrap().name, "b");

        let second = mock.create_bucket("c", &CorsPolicy::none()).await;
        assert_eq!(second, Err(ProviderError::Rejected("quota".to_string())));

        mock.verify();
        assert_eq!(mock.call_names(), vec!["create_bucket", "create_bucket"]);
    }

    #[tokio::test]
    #[should_panic(expected = "Expectation mismatch")]
    async fn test_mock_panics_on_mismatch() {
        let mock = MockProvider::new();
        mock.expect_create_bucket().return_ok(BucketHandle {
            name: "b".to_string(),
        });
        let gateway = GatewayHandle {
            id: "gw".to_string(),
            name: "g".to_string(),
            domain: "d".to_string(),
        };
        let _ = mock.deploy(&gateway).await;
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn test_verify_reports_pending() {
        let mock = MockProvider::new();
        mock.expect_deploy()
            .return_err(ProviderError::Rejected("never called".to_string()));
        mock.verify();
    }
}
