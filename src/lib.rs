//! # Stage Deploy
//!
//! > **Resolve a deployment stage and provision its fixed cloud topology, in order.**
//!
//! Given a stage (`production` or `staging`), this crate derives the concrete
//! infrastructure parameters for it (domain, certificate, bucket CORS policy,
//! protection policy) and drives a cloud provider through a fixed sequence:
//! storage bucket, API gateway, routes, deployment, usage plan.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Pure resolution, explicit side effects
//! Everything that can be decided without touching the cloud is a pure lookup:
//! [`StageResolver`](stage::StageResolver) and [`RouteTable`](routes::RouteTable)
//! never do I/O. All side effects go through the [`CloudProvider`](provider::CloudProvider)
//! and [`SecretStore`](secrets::SecretStore) traits.
//!
//! ### Order as data
//! The provisioning order is carried by the types each step returns. A gateway
//! cannot be deployed until every route registered, and a usage plan can only
//! be attached to a [`DeployedStage`](provider::DeployedStage), which only
//! deployment produces.
//!
//! ### Fail fast, no rollback
//! An unknown stage or a missing secret aborts before any provider call. A
//! provider failure aborts at that step with a
//! [`ProvisionError`](orchestrator::ProvisionError) naming the stage and step.
//! Only the usage plan is recoverable: the API is live, just unthrottled.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. Resolution ([`stage`], [`routes`], [`topology`])
//! - **Role**: Compiled-in tables for stage parameters, routes, and the fixed topology.
//! - **Key items**: [`StageResolver`](stage::StageResolver), [`RouteTable`](routes::RouteTable),
//!   [`Topology`](topology::Topology).
//!
//! ### 2. Collaborators ([`provider`], [`secrets`])
//! - **Role**: The side-effecting interfaces, plus an in-memory cloud actor and a mock.
//! - **Key items**: [`CloudProvider`](provider::CloudProvider),
//!   [`InMemoryProvider`](provider::memory::InMemoryProvider),
//!   [`MockProvider`](provider::mock::MockProvider).
//!
//! ### 3. The Orchestrator ([`orchestrator`])
//! - **Role**: Runs the sequence and returns [`ProvisionedResources`](orchestrator::ProvisionedResources).
//!
//! ### 4. Lifecycle ([`lifecycle`])
//! - **Role**: Wires the in-memory cloud to an orchestrator and shuts it down; tracing setup.
//!
//! ## 🔑 API Keys
//!
//! Binding issued API keys to the usage plan is a manual operator step. A run
//! whose routes require keys reports
//! [`ApiKeyBinding::PendingManual`](orchestrator::ApiKeyBinding::PendingManual)
//! and is never [`caller-ready`](orchestrator::ProvisionedResources::is_caller_ready)
//! until that binding is confirmed.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! DEPLOY_SECRET_POSTGRES_URL=postgres://... RUST_LOG=info cargo run -- --stage staging
//! ```

pub mod lifecycle;
pub mod orchestrator;
pub mod provider;
pub mod routes;
pub mod secrets;
pub mod stage;
pub mod topology;
