//! RPC provider failover subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (manager.rs)           Caller-observed failure
//!     → probe.rs (eth_chainId, timed)       → FailoverManager::report_failure
//!     → registry.rs (failure counts)        → registry.rs
//!     → rotation.rs (pick endpoint)         → rotation.rs (only if active failed)
//!     → active endpoint updated             → active endpoint updated
//! ```
//!
//! # Design Decisions
//! - Probes within a sweep run sequentially
//! - State lives behind one lock that is never held across an await
//! - Exactly one endpoint is active whenever any endpoint is configured;
//!   total outage keeps the last active endpoint instead of clearing it
//! - Probe failures are data, never errors returned to callers

pub mod endpoint;
pub mod manager;
pub mod probe;
pub mod registry;
pub mod rotation;

use thiserror::Error;

pub use endpoint::EndpointConfig;
pub use manager::{EndpointHealth, FailoverManager};
pub use probe::{HttpProbe, Probe, ProbeResult};
pub use registry::{HealthRecord, HealthRegistry};

/// Errors returned by failover operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    /// No endpoint with this name is configured.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// An endpoint URL could not be parsed.
    #[error("Invalid URL for endpoint '{name}': {reason}")]
    InvalidUrl { name: String, reason: String },
}

/// Result type for failover operations.
pub type FailoverResult<T> = Result<T, FailoverError>;
