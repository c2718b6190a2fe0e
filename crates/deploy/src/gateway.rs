//! Chain gateway: the account, network and transaction services the pipeline
//! consumes, plus the Ethereum JSON-RPC implementation used by the binary.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::rpc;

/// Errors reported by a [`ChainGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a readable response.
    #[error("transport error during {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    /// The node answered with a JSON-RPC error object.
    #[error("{method} failed with RPC error {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    /// The node answered with something that is not the expected shape.
    #[error("malformed {method} response: {reason}")]
    Malformed { method: String, reason: String },
}

/// Gas accounting of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    /// The gas limit the transaction was submitted with.
    #[serde(rename = "gas", deserialize_with = "rpc::deserialize_u64_from_hex")]
    pub gas_limit: u64,
    /// The gas price paid, when the node reports one.
    #[serde(default)]
    pub gas_price: Option<U256>,
}

/// The subset of a transaction receipt the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInfo {
    pub transaction_hash: B256,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(deserialize_with = "rpc::deserialize_u64_from_hex")]
    pub block_number: u64,
    #[serde(deserialize_with = "rpc::deserialize_u64_from_hex")]
    pub gas_used: u64,
    #[serde(default)]
    pub effective_gas_price: Option<U256>,
    /// `1` for success, `0` for a reverted transaction. Pre-Byzantium nodes omit it.
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u64_from_hex")]
    pub status: Option<u64>,
}

impl ReceiptInfo {
    /// Whether the transaction executed without reverting.
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

/// Account, network and transaction services provided by a chain node.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// The signing accounts available to the gateway, in node order.
    async fn accounts(&self) -> Result<Vec<Address>, GatewayError>;

    /// The native balance of `address` at the latest block, in wei.
    async fn balance(&self, address: Address) -> Result<U256, GatewayError>;

    /// The chain identifier of the connected network.
    async fn chain_id(&self) -> Result<u64, GatewayError>;

    /// The latest block number.
    async fn block_number(&self) -> Result<u64, GatewayError>;

    /// Submit a contract creation transaction signed by `from`.
    async fn send_creation(&self, from: Address, bytecode: Bytes) -> Result<B256, GatewayError>;

    /// Look up a transaction by hash. `None` while the node does not know it.
    async fn transaction(&self, hash: B256) -> Result<Option<TransactionMeta>, GatewayError>;

    /// Look up a receipt by hash. `None` until the transaction is mined.
    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, GatewayError>;

    /// Execute a read-only call against `to` at the latest block.
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, GatewayError>;
}

/// [`ChainGateway`] backed by an Ethereum JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcGateway {
    client: reqwest::Client,
    url: Url,
}

impl JsonRpcGateway {
    /// Create a gateway for `url`, with every request bounded by `request_timeout`.
    pub fn new(url: Url, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: rpc::create_client(request_timeout)?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn call_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, GatewayError> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    async fn hex_quantity(&self, method: &str) -> Result<u64, GatewayError> {
        let raw: String = self.call_rpc(method, vec![]).await?;
        rpc::parse_hex_u64(&raw).map_err(|e| GatewayError::Malformed {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ChainGateway for JsonRpcGateway {
    async fn accounts(&self) -> Result<Vec<Address>, GatewayError> {
        self.call_rpc("eth_accounts", vec![]).await
    }

    async fn balance(&self, address: Address) -> Result<U256, GatewayError> {
        self.call_rpc(
            "eth_getBalance",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }

    async fn chain_id(&self) -> Result<u64, GatewayError> {
        self.hex_quantity("eth_chainId").await
    }

    async fn block_number(&self) -> Result<u64, GatewayError> {
        self.hex_quantity("eth_blockNumber").await
    }

    async fn send_creation(&self, from: Address, bytecode: Bytes) -> Result<B256, GatewayError> {
        self.call_rpc(
            "eth_sendTransaction",
            vec![serde_json::json!({
                "from": from,
                "data": bytecode,
            })],
        )
        .await
    }

    async fn transaction(&self, hash: B256) -> Result<Option<TransactionMeta>, GatewayError> {
        self.call_rpc("eth_getTransactionByHash", vec![serde_json::json!(hash)])
            .await
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, GatewayError> {
        self.call_rpc("eth_getTransactionReceipt", vec![serde_json::json!(hash)])
            .await
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, GatewayError> {
        self.call_rpc(
            "eth_call",
            vec![
                serde_json::json!({
                    "to": to,
                    "data": calldata,
                }),
                serde_json::json!("latest"),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_deserialization() {
        let receipt: ReceiptInfo = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "blockNumber": "0x5",
            "gasUsed": "0x2dc6c0",
            "effectiveGasPrice": "0x3b9aca00",
            "status": "0x1",
            "logs": []
        }))
        .unwrap();

        assert_eq!(receipt.block_number, 5);
        assert_eq!(receipt.gas_used, 3_000_000);
        assert_eq!(receipt.effective_gas_price, Some(U256::from(1_000_000_000u64)));
        assert_eq!(
            receipt.contract_address,
            Some(
                "0x5FbDB2315678afecb367f032d93F642f64180aa3"
                    .parse::<Address>()
                    .unwrap()
            )
        );
        assert!(receipt.succeeded());
    }

    #[test]
    fn test_receipt_reverted_status() {
        let receipt: ReceiptInfo = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "contractAddress": null,
            "blockNumber": "0x9",
            "gasUsed": "0x5208",
            "status": "0x0"
        }))
        .unwrap();

        assert!(!receipt.succeeded());
        assert!(receipt.contract_address.is_none());
        assert!(receipt.effective_gas_price.is_none());
    }

    #[test]
    fn test_receipt_without_status_counts_as_success() {
        let receipt: ReceiptInfo = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "blockNumber": "0x1",
            "gasUsed": "0x1"
        }))
        .unwrap();

        assert_eq!(receipt.status, None);
        assert!(receipt.succeeded());
    }

    #[test]
    fn test_transaction_meta_deserialization() {
        let tx: TransactionMeta = serde_json::from_value(serde_json::json!({
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "gas": "0x1c9c380",
            "gasPrice": "0x77359400",
            "input": "0x6080"
        }))
        .unwrap();

        assert_eq!(tx.gas_limit, 30_000_000);
        assert_eq!(tx.gas_price, Some(U256::from(2_000_000_000u64)));
    }
}
