//! JSON-RPC plumbing.
//!
//! # Data Flow
//! ```text
//! RpcClient::call
//!     → FailoverManager::active_endpoint
//!     → jsonrpc.rs (POST with endpoint timeout)
//!     → on endpoint failure: report_failure → backoff.rs → retry
//! ```
//!
//! # Design Decisions
//! - The prober and the client share one wire implementation
//! - JSON-RPC error objects mean the node is alive; they are not failures

pub mod backoff;
pub mod client;
pub mod jsonrpc;

pub use backoff::Backoff;
pub use client::{RpcClient, RpcError, RpcResult};
pub use jsonrpc::EndpointError;
