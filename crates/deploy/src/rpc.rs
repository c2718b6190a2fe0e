//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::{future::Future, time::Duration};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::gateway::GatewayError;

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, GatewayError> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(|source| GatewayError::Transport {
            method: method.to_string(),
            source,
        })?;

    let result: Value = response
        .json()
        .await
        .map_err(|source| GatewayError::Transport {
            method: method.to_string(),
            source,
        })?;

    decode_response(method, result)
}

/// Split a JSON-RPC envelope into its result or its error object.
pub(crate) fn decode_response<T: DeserializeOwned>(
    method: &str,
    response: Value,
) -> Result<T, GatewayError> {
    if let Some(error) = response.get("error") {
        return Err(GatewayError::Rpc {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = response
        .get("result")
        .ok_or_else(|| GatewayError::Malformed {
            method: method.to_string(),
            reason: "no result in response".to_string(),
        })?
        .clone();

    serde_json::from_value(result_value).map_err(|e| GatewayError::Malformed {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Deserialize a u64 from a hex quantity (with 0x prefix).
pub(crate) fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_hex_u64(&s).map_err(serde::de::Error::custom)
}

/// Deserialize an optional u64 hex quantity, treating `null` and absence alike.
pub(crate) fn deserialize_opt_u64_from_hex<'de, D>(
    deserializer: D,
) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    s.as_deref()
        .map(parse_hex_u64)
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub(crate) fn parse_hex_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// Poll `check_fn` until it yields a value or `timeout` elapses.
///
/// Errors returned by `check_fn` are logged and polling continues; only the
/// deadline ends the wait. Returns `None` on timeout.
pub async fn poll_until<T, E, F, Fut>(
    name: &str,
    timeout: Duration,
    poll_interval: Duration,
    check_fn: F,
) -> Option<T>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = tokio::time::Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {
                tracing::trace!(target_name = %name, "Not ready yet, polling again...");
            }
            Err(e) => {
                tracing::debug!(error = %e, target_name = %name, "Poll failed, polling again...");
            }
        }

        if start.elapsed() >= timeout {
            return None;
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_response_result() {
        let value: String = decode_response(
            "eth_chainId",
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": "0x7a69"}),
        )
        .unwrap();
        assert_eq!(value, "0x7a69");
    }

    #[test]
    fn test_decode_response_error_object() {
        let err = decode_response::<String>(
            "eth_sendTransaction",
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32000, "message": "insufficient funds for gas * price + value"}
            }),
        )
        .unwrap_err();

        match err {
            GatewayError::Rpc {
                method,
                code,
                message,
            } => {
                assert_eq!(method, "eth_sendTransaction");
                assert_eq!(code, -32000);
                assert!(message.contains("insufficient funds"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_response_null_result_as_option() {
        let value: Option<String> = decode_response(
            "eth_getTransactionReceipt",
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": null}),
        )
        .unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_decode_response_missing_result() {
        let err =
            decode_response::<String>("eth_blockNumber", serde_json::json!({"id": 1})).unwrap_err();
        assert!(matches!(err, GatewayError::Malformed { .. }));
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x7a69").unwrap(), 31337);
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let result: Option<()> = poll_until(
            "never",
            Duration::from_millis(30),
            Duration::from_millis(5),
            || async { Ok::<_, String>(None) },
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_poll_until_keeps_polling_through_errors() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let result = poll_until(
            "flaky",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || {
                let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move {
                    match n {
                        0 => Err("connection reset".to_string()),
                        1 => Ok(None),
                        _ => Ok(Some(n)),
                    }
                }
            },
        )
        .await;
        assert_eq!(result, Some(2));
    }
}
