//! Contract deployment: submission and confirmation wait.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256, keccak256};
use thiserror::Error;

use crate::{
    artifact::Artifact,
    gateway::{ChainGateway, GatewayError},
    rpc,
    units::format_gwei,
};

/// Errors raised while deploying. Always fatal, never retried: a second
/// submission could publish a duplicate contract at a different address.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("deployment submission rejected: {reason}")]
    SubmissionRejected { reason: String },
    #[error("deployment transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx_hash: B256, timeout: Duration },
}

/// How long to wait for the creation transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Receipt metadata of the creation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptMeta {
    pub hash: B256,
    pub gas_limit: u64,
    pub gas_price: U256,
    /// Gas actually consumed by the creation.
    pub gas_used: u64,
    /// Block the contract was created in.
    pub block_number: u64,
}

/// A deployed contract, able to answer read-only queries through the gateway
/// that deployed it.
#[derive(Clone, Copy)]
pub struct ContractHandle<'g> {
    pub address: Address,
    pub receipt: ReceiptMeta,
    gateway: &'g dyn ChainGateway,
}

impl std::fmt::Debug for ContractHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("receipt", &self.receipt)
            .finish_non_exhaustive()
    }
}

impl<'g> ContractHandle<'g> {
    pub fn new(address: Address, receipt: ReceiptMeta, gateway: &'g dyn ChainGateway) -> Self {
        Self {
            address,
            receipt,
            gateway,
        }
    }

    /// Call a no-argument view function by its signature, e.g. `owner()`.
    pub async fn query(&self, signature: &str) -> Result<Bytes, GatewayError> {
        self.gateway
            .call(self.address, Bytes::copy_from_slice(&selector(signature)))
            .await
    }

    /// The contract's own native balance, in wei.
    pub async fn native_balance(&self) -> Result<U256, GatewayError> {
        self.gateway.balance(self.address).await
    }
}

/// The 4-byte function selector of `signature`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Submit the artifact's creation transaction and wait for its receipt.
pub async fn deploy<'g>(
    gateway: &'g dyn ChainGateway,
    deployer: Address,
    artifact: &Artifact,
    policy: ConfirmationPolicy,
) -> Result<ContractHandle<'g>, DeploymentError> {
    tracing::info!(contract = %artifact.contract_name, "Deploying contract...");

    let tx_hash = gateway
        .send_creation(deployer, artifact.bytecode.clone())
        .await
        .map_err(|e| DeploymentError::SubmissionRejected {
            reason: e.to_string(),
        })?;

    tracing::info!(tx_hash = %tx_hash, "Creation transaction submitted, waiting for confirmation...");

    let receipt = rpc::poll_until(
        "deployment receipt",
        policy.timeout,
        policy.poll_interval,
        || gateway.receipt(tx_hash),
    )
    .await
    .ok_or(DeploymentError::ConfirmationTimeout {
        tx_hash,
        timeout: policy.timeout,
    })?;

    if !receipt.succeeded() {
        return Err(DeploymentError::SubmissionRejected {
            reason: format!(
                "creation transaction {} reverted in block {}",
                tx_hash, receipt.block_number
            ),
        });
    }

    let address = receipt
        .contract_address
        .ok_or_else(|| DeploymentError::SubmissionRejected {
            reason: format!("receipt of {} carries no contract address", tx_hash),
        })?;

    // Gas accounting is informational: fall back to receipt values when the
    // node no longer serves the transaction body.
    let (gas_limit, gas_price) = match gateway.transaction(tx_hash).await {
        Ok(Some(tx)) => (
            tx.gas_limit,
            tx.gas_price.or(receipt.effective_gas_price).unwrap_or_default(),
        ),
        Ok(None) => {
            tracing::warn!(tx_hash = %tx_hash, "Creation transaction not found, using receipt gas values");
            (receipt.gas_used, receipt.effective_gas_price.unwrap_or_default())
        }
        Err(e) => {
            tracing::warn!(tx_hash = %tx_hash, error = %e, "Failed to fetch creation transaction, using receipt gas values");
            (receipt.gas_used, receipt.effective_gas_price.unwrap_or_default())
        }
    };

    let meta = ReceiptMeta {
        hash: tx_hash,
        gas_limit,
        gas_price,
        gas_used: receipt.gas_used,
        block_number: receipt.block_number,
    };

    tracing::info!(contract = %artifact.contract_name, "Contract deployed successfully!");
    tracing::info!(address = %address, "Contract address");
    tracing::info!(tx_hash = %meta.hash, "Transaction hash");
    tracing::info!(gas_limit = meta.gas_limit, gas_used = meta.gas_used, "Gas");
    tracing::info!(gas_price = %format_gwei(meta.gas_price), "Gas price (gwei)");

    Ok(ContractHandle::new(address, meta, gateway))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector() {
        // Well-known selectors.
        assert_eq!(selector("owner()"), [0x8d, 0xa5, 0xcb, 0x5b]);
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_default_policy() {
        let policy = ConfirmationPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(120));
        assert!(policy.poll_interval < policy.timeout);
    }
}
