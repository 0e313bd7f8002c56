use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::orchestrator::ProvisioningOrchestrator;
use crate::provider::memory::{self, InMemoryProvider};
use crate::routes::RouteTable;
use crate::secrets::SecretStore;

const CLOUD_BUFFER_SIZE: usize = 32;

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("In-memory cloud task failed: {0}")]
    CloudTask(#[from] tokio::task::JoinError),
}

/// A provisioning setup wired against the in-memory cloud.
///
/// `DeploySystem` is responsible for:
/// - **Lifecycle Management**: spawning the cloud actor and stopping it
/// - **Dependency Wiring**: handing the provider client, secret store and
///   route table to the orchestrator
///
/// # Example
///
/// ```ignore
/// let system = DeploySystem::new(secrets, RouteTable::standard()?);
/// let resources = system.orchestrator.run("staging").await?;
/// let snapshot = system.provider.snapshot().await?;
/// system.shutdown().await?;
/// ```
pub struct DeploySystem<S> {
    pub orchestrator: ProvisioningOrchestrator<InMemoryProvider, S>,

    /// Extra client onto the same cloud, for inspecting what a run created.
    pub provider: InMemoryProvider,

    handle: JoinHandle<()>,
}

impl<S: SecretStore> DeploySystem<S> {
    /// Spawns the in-memory cloud and builds an orchestrator on top of it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(secrets: S, routes: RouteTable) -> Self {
        let (cloud, provider) = memory::new(CLOUD_BUFFER_SIZE);
        let handle = tokio::spawn(cloud.run());
        let orchestrator = ProvisioningOrchestrator::new(provider.clone(), secrets, routes);

        Self {
            orchestrator,
            provider,
            handle,
        }
    }

    /// Drops every client so the cloud actor's channel closes, then waits for
    /// the actor to finish.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        info!("Shutting down deploy system...");

        drop(self.orchestrator);
        drop(self.provider);

        if let Err(e) = self.handle.await {
            error!(error = %e, "In-memory cloud task failed");
            return Err(e.into());
        }

        info!("Deploy system shutdown complete.");
        Ok(())
    }
}
