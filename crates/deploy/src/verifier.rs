//! Post-deploy sanity checks of the contract's initial state.
//!
//! Verification is diagnostic only. Every query runs independently and its
//! failure is recorded next to the other results instead of being propagated.

use std::fmt;

use alloy_core::primitives::{Address, U256};
use thiserror::Error;

use crate::{executor::ContractHandle, gateway::GatewayError, units::format_ether};

/// How the raw return data of a query is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    Address,
    Uint,
    Percent,
}

/// What a state query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// A no-argument view function.
    View {
        signature: &'static str,
        decoding: Decoding,
    },
    /// The native balance held by the contract.
    NativeBalance,
}

/// A named read-only query against the deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateQuery {
    pub name: &'static str,
    pub target: QueryTarget,
}

/// The fixed set of checks run after a `Project` deployment.
pub const PROJECT_QUERIES: [StateQuery; 4] = [
    StateQuery {
        name: "owner",
        target: QueryTarget::View {
            signature: "owner()",
            decoding: Decoding::Address,
        },
    },
    StateQuery {
        name: "projectCounter",
        target: QueryTarget::View {
            signature: "projectCounter()",
            decoding: Decoding::Uint,
        },
    },
    StateQuery {
        name: "platformFeePercent",
        target: QueryTarget::View {
            signature: "platformFeePercent()",
            decoding: Decoding::Percent,
        },
    },
    StateQuery {
        name: "balance",
        target: QueryTarget::NativeBalance,
    },
];

/// A decoded query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryValue {
    Address(Address),
    Uint(U256),
    Percent(U256),
    /// Wei amount, displayed in ether.
    Ether(U256),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Address(address) => write!(f, "{address}"),
            QueryValue::Uint(value) => write!(f, "{value}"),
            QueryValue::Percent(value) => write!(f, "{value}%"),
            QueryValue::Ether(wei) => write!(f, "{} ETH", format_ether(*wei)),
        }
    }
}

/// Why a single query failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("call failed: {0}")]
    Call(String),
    #[error("cannot decode return data: {0}")]
    Decode(String),
}

impl From<GatewayError> for QueryError {
    fn from(err: GatewayError) -> Self {
        Self::Call(err.to_string())
    }
}

/// Outcome of every query, in query order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    entries: Vec<(&'static str, Result<QueryValue, QueryError>)>,
}

impl VerificationResult {
    pub fn push(&mut self, name: &'static str, outcome: Result<QueryValue, QueryError>) {
        self.entries.push((name, outcome));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, Result<QueryValue, QueryError>)> {
        self.entries.iter()
    }

    /// The outcome of the query named `name`, if it ran.
    pub fn get(&self, name: &str) -> Option<&Result<QueryValue, QueryError>> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run the [`PROJECT_QUERIES`] against `handle`.
pub async fn verify(handle: &ContractHandle<'_>) -> VerificationResult {
    verify_with(handle, &PROJECT_QUERIES).await
}

/// Run `queries` against `handle`, collecting each outcome.
pub async fn verify_with(
    handle: &ContractHandle<'_>,
    queries: &[StateQuery],
) -> VerificationResult {
    tracing::info!("Verifying initial contract state...");

    let mut result = VerificationResult::default();
    for query in queries {
        let outcome = run_query(handle, query).await;
        match &outcome {
            Ok(value) => tracing::info!(query = query.name, value = %value, "✓ State check"),
            Err(e) => tracing::warn!(query = query.name, error = %e, "State check failed"),
        }
        result.push(query.name, outcome);
    }
    result
}

async fn run_query(
    handle: &ContractHandle<'_>,
    query: &StateQuery,
) -> Result<QueryValue, QueryError> {
    match query.target {
        QueryTarget::View {
            signature,
            decoding,
        } => {
            let data = handle.query(signature).await?;
            decode(&data, decoding)
        }
        QueryTarget::NativeBalance => Ok(QueryValue::Ether(handle.native_balance().await?)),
    }
}

/// Decode the first 32-byte word of `data`.
pub fn decode(data: &[u8], decoding: Decoding) -> Result<QueryValue, QueryError> {
    if data.is_empty() {
        return Err(QueryError::Decode(
            "empty return data (function missing?)".to_string(),
        ));
    }
    let word: &[u8; 32] = data
        .get(..32)
        .and_then(|w| w.try_into().ok())
        .ok_or_else(|| QueryError::Decode(format!("expected 32 bytes, got {}", data.len())))?;

    match decoding {
        Decoding::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(QueryError::Decode(
                    "address word has non-zero padding".to_string(),
                ));
            }
            Ok(QueryValue::Address(Address::from_slice(&word[12..])))
        }
        Decoding::Uint => Ok(QueryValue::Uint(U256::from_be_bytes(*word))),
        Decoding::Percent => Ok(QueryValue::Percent(U256::from_be_bytes(*word))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: u64) -> Vec<u8> {
        U256::from(value).to_be_bytes::<32>().to_vec()
    }

    #[test]
    fn test_decode_uint() {
        assert_eq!(
            decode(&word(7), Decoding::Uint).unwrap(),
            QueryValue::Uint(U256::from(7u64))
        );
    }

    #[test]
    fn test_decode_address() {
        let mut data = vec![0u8; 12];
        data.extend_from_slice(&[0xab; 20]);
        assert_eq!(
            decode(&data, Decoding::Address).unwrap(),
            QueryValue::Address(Address::repeat_byte(0xab))
        );
    }

    #[test]
    fn test_decode_address_rejects_dirty_padding() {
        let data = vec![0xffu8; 32];
        assert!(decode(&data, Decoding::Address).is_err());
    }

    #[test]
    fn test_decode_empty_and_short_data() {
        assert!(matches!(
            decode(&[], Decoding::Uint),
            Err(QueryError::Decode(_))
        ));
        assert!(matches!(
            decode(&[0u8; 16], Decoding::Uint),
            Err(QueryError::Decode(_))
        ));
    }

    #[test]
    fn test_display_values() {
        assert_eq!(QueryValue::Percent(U256::from(5u64)).to_string(), "5%");
        assert_eq!(QueryValue::Uint(U256::from(0u64)).to_string(), "0");
        assert_eq!(QueryValue::Ether(U256::ZERO).to_string(), "0.0 ETH");
    }

    #[test]
    fn test_project_queries_are_fixed() {
        let names: Vec<_> = PROJECT_QUERIES.iter().map(|q| q.name).collect();
        assert_eq!(
            names,
            ["owner", "projectCounter", "platformFeePercent", "balance"]
        );
    }

    #[test]
    fn test_verification_result_counts_failures() {
        let mut result = VerificationResult::default();
        result.push("owner", Ok(QueryValue::Address(Address::ZERO)));
        result.push("projectCounter", Err(QueryError::Call("reverted".to_string())));

        assert_eq!(result.len(), 2);
        assert_eq!(result.failures(), 1);
        assert!(result.get("owner").unwrap().is_ok());
        assert!(result.get("balance").is_none());
    }
}
