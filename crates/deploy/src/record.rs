//! Deployment provenance records and their on-disk store.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, SecondsFormat, Utc};
use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    artifact::Artifact,
    executor::ContractHandle,
    network::{AccountInfo, NetworkInfo},
};

/// Default directory for deployment records.
pub const DEFAULT_RECORDS_DIR: &str = "deployments";

/// Errors raised while persisting a record. Advisory: the deployment itself
/// already succeeded.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create records directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize deployment record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write deployment record {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persisted provenance of one deployment.
///
/// Field names are consumed by frontends and explorers and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub contract_address: String,
    pub deployer: String,
    pub network: String,
    pub chain_id: u64,
    pub block_number: u64,
    pub transaction_hash: String,
    /// Gas limit of the creation transaction, in decimal.
    pub gas_used: String,
    /// Gas price in wei, in decimal.
    pub gas_price: String,
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub deployment_time: String,
    /// The contract ABI as a serialized JSON string.
    pub abi: String,
}

impl DeploymentRecord {
    /// Build a record from resolver and executor output only.
    pub fn new(
        artifact: &Artifact,
        network: &NetworkInfo,
        account: &AccountInfo,
        handle: &ContractHandle<'_>,
        deployed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            contract_name: artifact.contract_name.clone(),
            contract_address: handle.address.to_string(),
            deployer: account.address.to_string(),
            network: network.name.clone(),
            chain_id: network.chain_id,
            block_number: handle.receipt.block_number,
            transaction_hash: handle.receipt.hash.to_string(),
            gas_used: handle.receipt.gas_limit.to_string(),
            gas_price: handle.receipt.gas_price.to_string(),
            deployment_time: deployed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            abi: artifact.abi.to_string(),
        }
    }
}

/// Storage key of a record: `deployment-<network>-<epochMillis>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, From)]
pub struct RecordKey(String);

/// Last millisecond stamp issued by this process.
static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

impl RecordKey {
    /// Issue a fresh key for `network_name`.
    ///
    /// The millisecond component is strictly increasing within the process, so
    /// two records for the same network never share a key.
    pub fn issue(network_name: &str) -> Self {
        Self::with_millis(network_name, next_millis(Utc::now().timestamp_millis()))
    }

    fn with_millis(network_name: &str, millis: i64) -> Self {
        Self(format!("deployment-{}-{}", sanitize(network_name), millis))
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

fn next_millis(now: i64) -> i64 {
    let mut last = LAST_ISSUED_MILLIS.load(Ordering::SeqCst);
    loop {
        let next = now.max(last + 1);
        match LAST_ISSUED_MILLIS.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Keep network names usable as a single path component.
fn sanitize(network_name: &str) -> String {
    let cleaned: String = network_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Where a record was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub key: RecordKey,
    pub path: PathBuf,
}

/// Directory of deployment records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `record` under a fresh key, creating the directory when absent.
    pub fn persist(&self, record: &DeploymentRecord) -> Result<RecordLocation, PersistenceError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
            tracing::debug!(path = %self.dir.display(), "Created records directory");
        }

        let json = serde_json::to_string_pretty(record)?;

        let key = RecordKey::issue(&record.network);
        let path = self.dir.join(key.file_name());

        std::fs::write(&path, json).map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Deployment info saved");
        Ok(RecordLocation { key, path })
    }

    /// Load a previously written record.
    pub fn load(path: &Path) -> anyhow::Result<DeploymentRecord> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment record {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse deployment record JSON")
    }
}
