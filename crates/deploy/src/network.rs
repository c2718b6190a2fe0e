//! Network and deployer account resolution.

use alloy_core::primitives::{Address, U256};
use thiserror::Error;

use crate::{
    gateway::{ChainGateway, GatewayError},
    units::format_ether,
};

/// Chain id of the local Hardhat/Anvil development network.
///
/// Deployments to this chain are ephemeral, so no explorer verification is suggested.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Errors raised while resolving the network context. Always fatal.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("no signing account is available on the chain gateway")]
    NoAccount,
    #[error("chain gateway unavailable: {0}")]
    GatewayUnavailable(#[source] GatewayError),
}

impl From<GatewayError> for ResolutionError {
    fn from(err: GatewayError) -> Self {
        Self::GatewayUnavailable(err)
    }
}

/// Snapshot of the target network, taken once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
    pub block_number: u64,
}

impl NetworkInfo {
    /// Whether this is the local development network.
    pub fn is_local(&self, local_chain_id: u64) -> bool {
        self.chain_id == local_chain_id
    }
}

/// The deploying account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: Address,
    /// Native balance in wei.
    pub balance: U256,
}

/// Well-known name of a chain id, as used by Hardhat network configs.
pub fn known_network_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("mainnet"),
        10 => Some("optimism"),
        137 => Some("polygon"),
        8453 => Some("base"),
        17000 => Some("holesky"),
        42161 => Some("arbitrum"),
        80002 => Some("amoy"),
        84532 => Some("base-sepolia"),
        11155111 => Some("sepolia"),
        11155420 => Some("optimism-sepolia"),
        LOCAL_CHAIN_ID => Some("hardhat"),
        _ => None,
    }
}

/// Resolve the deployer account and the network identity.
///
/// The first signing account exposed by the gateway is the deployer. A
/// configured `network_name` takes precedence over the well-known name of the
/// chain id.
pub async fn resolve(
    gateway: &dyn ChainGateway,
    network_name: Option<&str>,
) -> Result<(NetworkInfo, AccountInfo), ResolutionError> {
    let accounts = gateway.accounts().await?;
    let address = *accounts.first().ok_or(ResolutionError::NoAccount)?;

    tracing::info!(address = %address, "Deploying contracts with account");

    let balance = gateway.balance(address).await?;
    tracing::info!(balance = %format_ether(balance), "Account balance (ETH)");

    if balance.is_zero() {
        tracing::warn!(address = %address, "Deployer account has no funds");
    }

    let chain_id = gateway.chain_id().await?;
    let block_number = gateway.block_number().await?;

    let name = network_name
        .map(str::to_string)
        .or_else(|| known_network_name(chain_id).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    tracing::debug!(network = %name, chain_id, block_number, "Network resolved");

    Ok((
        NetworkInfo {
            name,
            chain_id,
            block_number,
        },
        AccountInfo { address, balance },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_network_names() {
        assert_eq!(known_network_name(1), Some("mainnet"));
        assert_eq!(known_network_name(11155111), Some("sepolia"));
        assert_eq!(known_network_name(LOCAL_CHAIN_ID), Some("hardhat"));
        assert_eq!(known_network_name(424242), None);
    }

    #[test]
    fn test_is_local() {
        let network = NetworkInfo {
            name: "hardhat".to_string(),
            chain_id: 31337,
            block_number: 0,
        };
        assert!(network.is_local(LOCAL_CHAIN_ID));
        assert!(!network.is_local(1));
    }
}
