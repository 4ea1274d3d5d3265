//! JSON-RPC client that routes every call through the failover manager.
//!
//! # Responsibilities
//! - Send calls to the currently active endpoint
//! - Report endpoint-level failures so rotation happens without waiting for
//!   the next health sweep
//! - Retry on the (possibly new) active endpoint with backoff

use alloy::primitives::U64;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::failover::FailoverManager;
use crate::observability::metrics;
use crate::rpc::backoff::Backoff;
use crate::rpc::jsonrpc::{self, EndpointError, JsonRpcRequest};

/// Errors that can occur during RPC calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The failover manager has no endpoints configured.
    #[error("No RPC endpoint available")]
    NoEndpoint,

    /// The node answered with a JSON-RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The result did not have the expected shape.
    #[error("Failed to decode RPC result: {0}")]
    Decode(String),

    /// Every attempt failed at the endpoint level.
    #[error("RPC call failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: EndpointError },
}

/// Result type for RPC calls.
pub type RpcResult<T> = Result<T, RpcError>;

/// Failover-aware JSON-RPC client.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    failover: Arc<FailoverManager>,
    backoff: Backoff,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(failover: Arc<FailoverManager>, backoff: Backoff) -> Self {
        Self {
            http: reqwest::Client::new(),
            failover,
            backoff,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn failover(&self) -> &Arc<FailoverManager> {
        &self.failover
    }

    /// Call `method` and decode the result.
    ///
    /// Transport errors, timeouts, bad statuses and malformed bodies are
    /// reported to the failover manager and retried up to the endpoint's
    /// `max_retries`. JSON-RPC error objects are returned as-is.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let mut attempt: u32 = 0;

        loop {
            let endpoint = self.failover.active_endpoint().ok_or(RpcError::NoEndpoint)?;
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let request = JsonRpcRequest::new(id, method, params.clone());

            match jsonrpc::post(&self.http, &endpoint, &request).await {
                Ok(value) => {
                    metrics::record_rpc_call(&endpoint.name, "ok");
                    return serde_json::from_value(value).map_err(|e| RpcError::Decode(e.to_string()));
                }
                Err(EndpointError::Rpc { code, message }) => {
                    metrics::record_rpc_call(&endpoint.name, "rpc_error");
                    return Err(RpcError::Rpc { code, message });
                }
                Err(e) => {
                    metrics::record_rpc_call(&endpoint.name, "endpoint_error");
                    tracing::warn!(
                        endpoint = %endpoint.name,
                        method,
                        attempt,
                        error = %e,
                        "RPC call failed, reporting endpoint failure"
                    );
                    // The endpoint came from the manager, so the name is known.
                    let _ = self.failover.report_failure(&endpoint.name);

                    if attempt >= endpoint.max_retries {
                        return Err(RpcError::Exhausted {
                            attempts: attempt + 1,
                            last_error: e,
                        });
                    }

                    attempt += 1;
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                }
            }
        }
    }

    /// Get the chain ID.
    pub async fn chain_id(&self) -> RpcResult<u64> {
        let id: U64 = self.call("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    /// Get the latest block number.
    pub async fn block_number(&self) -> RpcResult<u64> {
        let number: U64 = self.call("eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("failover", &self.failover)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::{EndpointConfig, HttpProbe};
    use std::time::Duration;
    use url::Url;

    #[tokio::test]
    async fn test_no_endpoint() {
        let failover = Arc::new(FailoverManager::new(Vec::new(), 3, Arc::new(HttpProbe::new())));
        let client = RpcClient::new(failover, Backoff::new(1, 1));
        assert_eq!(client.chain_id().await.unwrap_err(), RpcError::NoEndpoint);
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_are_reported() {
        let dead = |name: &str, priority| {
            EndpointConfig::new(name, Url::parse("http://127.0.0.1:1").unwrap(), priority)
                .with_timeout(Duration::from_millis(300))
                .with_max_retries(2)
        };
        let failover = Arc::new(FailoverManager::new(
            vec![dead("a", 2), dead("b", 1)],
            3,
            Arc::new(HttpProbe::new()),
        ));
        let client = RpcClient::new(failover.clone(), Backoff::new(1, 2));

        let err = client.block_number().await.unwrap_err();
        assert!(matches!(err, RpcError::Exhausted { attempts: 3, .. }));

        let status = failover.health_status();
        assert_eq!(status[0].record.failure_count, 3);
        assert!(!status[0].record.healthy);
    }
}
