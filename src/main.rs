//! Operator entry point: provisions one stage against the in-memory cloud and
//! prints the resulting endpoints as JSON.

use clap::Parser;
use stage_deploy::lifecycle::{setup_tracing, DeploySystem};
use stage_deploy::routes::RouteTable;
use stage_deploy::secrets::{EnvSecretStore, FallbackSecretStore, StaticSecretStore};
use std::error::Error;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "stage-deploy", version, about = "Provision the calc backend for one stage")]
struct Cli {
    /// Deployment stage to provision (production | staging).
    #[arg(long, env = "DEPLOY_STAGE")]
    stage: String,

    /// Secret override as NAME=VALUE. Takes precedence over DEPLOY_SECRET_<NAME>.
    #[arg(long = "secret", value_name = "NAME=VALUE")]
    secrets: Vec<String>,

    /// Confirm that issued API keys were already bound to the usage plan.
    #[arg(long)]
    confirm_api_keys: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            error!(error = %message, "Provisioning failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut overrides = StaticSecretStore::new();
    for pair in &cli.secrets {
        let (name, value) = StaticSecretStore::parse_pair(pair)?;
        overrides.insert(name, value);
    }
    let secrets = FallbackSecretStore::new(overrides, EnvSecretStore::new());

    let system = DeploySystem::new(secrets, RouteTable::standard()?);
    let result = system.orchestrator.run(&cli.stage).await;
    system.shutdown().await?;

    let mut resources = result?;
    if cli.confirm_api_keys {
        resources.confirm_api_key_binding();
    }
    for alert in resources.alerts() {
        warn!(%alert, "Operator action required");
    }
    info!(caller_ready = resources.is_caller_ready(), "Run finished");

    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}
