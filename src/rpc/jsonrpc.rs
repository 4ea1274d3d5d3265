//! JSON-RPC 2.0 wire types and the single POST helper shared by the
//! health prober and the RPC client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time;

use crate::failover::EndpointConfig;

/// Outgoing JSON-RPC request.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Error object carried by a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Incoming JSON-RPC response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

/// Why a request to an endpoint did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl JsonRpcResponse {
    /// Split the response into its result or error.
    pub fn into_result(self) -> Result<Value, EndpointError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(EndpointError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(EndpointError::Malformed(
                "response has neither result nor error".to_string(),
            )),
        }
    }
}

/// POST one JSON-RPC request to `endpoint`, bounded by the endpoint timeout.
pub async fn post(
    client: &reqwest::Client,
    endpoint: &EndpointConfig,
    request: &JsonRpcRequest<'_>,
) -> Result<Value, EndpointError> {
    let exchange = async {
        let response = client
            .post(endpoint.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::Status(status.as_u16()));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| EndpointError::Malformed(e.to_string()))?;
        body.into_result()
    };

    match time::timeout(endpoint.timeout(), exchange).await {
        Ok(result) => result,
        Err(_) => Err(EndpointError::Timeout(endpoint.timeout_ms)),
    }
}
