//! Shared utilities for integration tests.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// How a mock node answers.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Healthy = 0,
    Unavailable = 1,
    RpcError = 2,
    Malformed = 3,
    Hang = 4,
}

impl Mode {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Mode::Unavailable,
            2 => Mode::RpcError,
            3 => Mode::Malformed,
            4 => Mode::Hang,
            _ => Mode::Healthy,
        }
    }
}

#[derive(Clone)]
struct NodeState {
    chain_id: u64,
    block_number: u64,
    mode: Arc<AtomicU8>,
    calls: Arc<AtomicU32>,
}

/// A JSON-RPC node on an ephemeral localhost port whose behaviour can be
/// switched at runtime.
pub struct MockNode {
    pub addr: SocketAddr,
    mode: Arc<AtomicU8>,
    calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl MockNode {
    pub async fn start(chain_id: u64, block_number: u64) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = NodeState {
            chain_id,
            block_number,
            mode: Arc::new(AtomicU8::new(Mode::Healthy as u8)),
            calls: Arc::new(AtomicU32::new(0)),
        };
        let node = Self {
            addr,
            mode: state.mode.clone(),
            calls: state.calls.clone(),
        };

        let app = Router::new().route("/", post(handle)).with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        node
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn handle(State(state): State<NodeState>, Json(request): Json<Value>) -> axum::response::Response {
    state.calls.fetch_add(1, Ordering::SeqCst);
    let id = request["id"].clone();

    match Mode::from_u8(state.mode.load(Ordering::SeqCst)) {
        Mode::Healthy => {
            let result = match request["method"].as_str() {
                Some("eth_chainId") => json!(format!("{:#x}", state.chain_id)),
                Some("eth_blockNumber") => json!(format!("{:#x}", state.block_number)),
                _ => {
                    return Json(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32601, "message": "method not found" }
                    }))
                    .into_response()
                }
            };
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
        }
        Mode::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded").into_response(),
        Mode::RpcError => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": "header not found" }
        }))
        .into_response(),
        Mode::Malformed => (StatusCode::OK, "<html>captive portal</html>").into_response(),
        Mode::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}
