//! kickoff: RPC provider failover and game back-office services.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML) ──▶ AppContext::build
//!                          │
//!        ┌─────────────────┼──────────────────────────────┐
//!        ▼                 ▼                              ▼
//!   failover          rpc::RpcClient                 game managers
//!   (probe, registry, (retries through the           (battle pass, economy,
//!    rotation,         active endpoint)               clans, merch, ranking,
//!    periodic checks)                                 seasons) ──▶ store
//!        ▲                                                ▲
//!        └──────────── admin API / kickoff-cli ───────────┘
//!
//!   auth (SIWE)    observability (tracing, metrics)    lifecycle (signals, shutdown)
//! ```

pub mod admin;
pub mod auth;
pub mod config;
pub mod context;
pub mod failover;
pub mod game;
pub mod lifecycle;
pub mod observability;
pub mod rpc;
pub mod store;

pub use config::KickoffConfig;
pub use context::AppContext;
pub use failover::{EndpointConfig, FailoverManager};
pub use lifecycle::Shutdown;
pub use rpc::RpcClient;
