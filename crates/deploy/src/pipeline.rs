//! The deployment pipeline: resolve, deploy, verify, record, report.
//!
//! Steps run strictly in sequence. Resolution and deployment failures are
//! fatal and end the run; verification and persistence failures are advisory
//! and only show up in the [`Diagnostics`] of a successful outcome.

use std::process::ExitCode;

use chrono::Utc;
use thiserror::Error;

use crate::{
    artifact::Artifact,
    executor::{self, ConfirmationPolicy, DeploymentError},
    gateway::ChainGateway,
    network::{self, NetworkInfo, ResolutionError},
    record::{DeploymentRecord, PersistenceError, RecordLocation, RecordStore},
    report::Reporter,
    verifier::{self, VerificationResult},
};

/// A failure that aborts the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
}

/// Everything a successful run learned besides the record itself.
#[derive(Debug)]
pub struct Diagnostics {
    pub network: NetworkInfo,
    pub verification: VerificationResult,
    pub persisted: Result<RecordLocation, PersistenceError>,
    pub explorer_command: Option<String>,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    Success {
        record: DeploymentRecord,
        diagnostics: Diagnostics,
    },
    Fatal(PipelineError),
}

impl PipelineOutcome {
    /// Success depends on the deployment alone, not on verification or persistence.
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Orchestrates one deployment of one artifact.
pub struct DeploymentPipeline<G> {
    gateway: G,
    artifact: Artifact,
    network_name: Option<String>,
    confirmation: ConfirmationPolicy,
    store: RecordStore,
    reporter: Reporter,
}

impl<G: ChainGateway> DeploymentPipeline<G> {
    pub fn new(gateway: G, artifact: Artifact, store: RecordStore) -> Self {
        Self {
            gateway,
            artifact,
            network_name: None,
            confirmation: ConfirmationPolicy::default(),
            store,
            reporter: Reporter::default(),
        }
    }

    /// Override the network name reported by the resolver.
    pub fn network_name(mut self, name: impl Into<String>) -> Self {
        self.network_name = Some(name.into());
        self
    }

    pub fn confirmation(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Run every step, report, and return the outcome.
    pub async fn run(&self) -> PipelineOutcome {
        tracing::info!(contract = %self.artifact.contract_name, "Starting deployment...");

        let outcome = match self.execute().await {
            Ok((record, diagnostics)) => PipelineOutcome::Success {
                record,
                diagnostics,
            },
            Err(err) => PipelineOutcome::Fatal(err),
        };

        self.reporter.report(&outcome);
        outcome
    }

    async fn execute(&self) -> Result<(DeploymentRecord, Diagnostics), PipelineError> {
        let gateway: &dyn ChainGateway = &self.gateway;

        let (network, account) = network::resolve(gateway, self.network_name.as_deref()).await?;

        let handle =
            executor::deploy(gateway, account.address, &self.artifact, self.confirmation).await?;

        // Built before verification so that it can be written whatever the checks report.
        let record =
            DeploymentRecord::new(&self.artifact, &network, &account, &handle, Utc::now());

        let verification = verifier::verify(&handle).await;

        let persisted = self.store.persist(&record);

        let explorer_command = self
            .reporter
            .explorer_command(&network, &record.contract_address);

        Ok((
            record,
            Diagnostics {
                network,
                verification,
                persisted,
                explorer_command,
            },
        ))
    }
}
