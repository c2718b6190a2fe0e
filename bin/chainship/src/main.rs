//! chainship deploys a compiled contract and records where, when and how it landed.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use chainship_deploy::{
    Artifact, DeployConfig, DeploymentPipeline, JsonRpcGateway, record::RecordStore,
};
use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "Deployment aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.apply(DeployConfig::load(cli.config.as_deref())?);
    config.validate()?;

    if cli.dump_config {
        let content =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
        println!("{content}");
        return Ok(ExitCode::SUCCESS);
    }

    tracing::info!(
        rpc_url = %config.rpc_url,
        artifact = %config.artifact.display(),
        records_dir = %config.records_dir.display(),
        "Loading deployment..."
    );

    let artifact = Artifact::load(&config.artifact)?;
    let gateway = JsonRpcGateway::new(config.rpc_url()?, config.rpc_timeout())
        .context("Failed to create HTTP client")?;

    let mut pipeline = DeploymentPipeline::new(
        gateway,
        artifact,
        RecordStore::new(config.records_dir.clone()),
    )
    .confirmation(config.confirmation())
    .reporter(config.reporter());

    if let Some(network_name) = &config.network_name {
        pipeline = pipeline.network_name(network_name.clone());
    }

    let outcome = pipeline.run().await;
    Ok(outcome.exit_code())
}
