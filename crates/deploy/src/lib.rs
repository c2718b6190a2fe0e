//! chainship-deploy - One-shot contract deployment with provenance records.
//!
//! This crate drives the deployment of a single compiled contract: it resolves
//! the network and deployer account, publishes the artifact, checks the
//! contract's initial state, and persists a JSON deployment record for
//! frontends, explorers and audit trails.

pub mod artifact;
pub mod config;
pub mod executor;
pub mod gateway;
pub mod network;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod rpc;
pub mod units;
pub mod verifier;

pub use artifact::{Artifact, ArtifactError};
pub use config::{CONFIG_FILENAME, DeployConfig};
pub use executor::{ConfirmationPolicy, ContractHandle, DeploymentError, ReceiptMeta};
pub use gateway::{ChainGateway, GatewayError, JsonRpcGateway, ReceiptInfo, TransactionMeta};
pub use network::{AccountInfo, LOCAL_CHAIN_ID, NetworkInfo, ResolutionError};
pub use pipeline::{DeploymentPipeline, Diagnostics, PipelineError, PipelineOutcome};
pub use record::{DeploymentRecord, PersistenceError, RecordKey, RecordLocation, RecordStore};
pub use report::Reporter;
pub use verifier::{QueryError, QueryValue, VerificationResult};
