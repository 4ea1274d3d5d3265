//! Endpoint liveness probing.
//!
//! # Responsibilities
//! - Issue one `eth_chainId` request per probe
//! - Bound the wait by the endpoint timeout
//! - Report round-trip latency or the reason the probe failed
//!
//! # Design Decisions
//! - A probe never panics and never returns an error to the sweep; failures
//!   are values the registry records
//! - A JSON-RPC error object counts as a failure: a healthy node always
//!   answers `eth_chainId`

use alloy::primitives::U64;
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};

use crate::failover::EndpointConfig;
use crate::rpc::jsonrpc::{self, EndpointError, JsonRpcRequest};

/// Latency on success, the failure reason otherwise.
pub type ProbeResult = Result<Duration, EndpointError>;

/// Something that can check whether an endpoint is alive.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, endpoint: &EndpointConfig) -> ProbeResult;
}

/// Probes endpoints over HTTP with a JSON-RPC chain-id query.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("kickoff-health-check")
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client for probes");
                reqwest::Client::new()
            });
        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, endpoint: &EndpointConfig) -> ProbeResult {
        let started = Instant::now();
        let request = JsonRpcRequest::new(1, "eth_chainId", json!([]));

        let result = jsonrpc::post(&self.client, endpoint, &request).await?;
        let chain_id: U64 = serde_json::from_value(result)
            .map_err(|e| EndpointError::Malformed(format!("chain id: {}", e)))?;

        let latency = started.elapsed();
        tracing::trace!(
            endpoint = %endpoint.name,
            chain_id = chain_id.to::<u64>(),
            latency_ms = latency.as_millis() as u64,
            "Probe succeeded"
        );
        Ok(latency)
    }
}
