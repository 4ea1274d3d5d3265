//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for kickoff.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KickoffConfig {
    /// RPC failover behaviour.
    pub failover: FailoverConfig,

    /// RPC endpoints, in configuration order.
    pub endpoints: Vec<EndpointSpec>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Sign-In with Ethereum settings.
    pub auth: AuthConfig,

    /// Repository backend.
    pub storage: StorageConfig,

    /// Game rules.
    pub game: GameConfig,
}

/// Failover manager settings shared by all endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Consecutive-failure count at which an endpoint is unhealthy.
    pub unhealthy_threshold: u32,

    /// Periodic health check interval in milliseconds.
    pub check_interval_ms: u64,

    /// Probe timeout used when an endpoint does not set one.
    pub default_timeout_ms: u64,

    /// Call retries used when an endpoint does not set them.
    pub default_max_retries: u32,

    /// Base delay for RPC call retry backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for RPC call retry backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl FailoverConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            unhealthy_threshold: 3,
            check_interval_ms: 30_000,
            default_timeout_ms: 5_000,
            default_max_retries: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2_000,
        }
    }
}

/// A configured RPC endpoint as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointSpec {
    /// Unique display name.
    pub name: String,

    /// JSON-RPC URL.
    pub url: String,

    /// Higher is preferred.
    #[serde(default)]
    pub priority: u32,

    /// Probe timeout in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Retries for calls routed through this endpoint.
    pub max_retries: Option<u32>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Sign-In with Ethereum configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Domain that must appear in signed messages.
    pub domain: String,

    /// URI that must appear in signed messages.
    pub uri: String,

    /// Chain ID accepted for sign-in.
    pub chain_id: u64,

    /// How long an issued nonce stays valid, in seconds.
    pub nonce_ttl_secs: u64,

    /// Session lifetime when the message has no expiration time, in seconds.
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: "localhost:3000".to_string(),
            uri: "http://localhost:3000".to_string(),
            chain_id: 1,
            nonce_ttl_secs: 300,
            session_ttl_secs: 86_400,
        }
    }
}

/// Which repository implementation backs the game managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory holding one JSON file per collection (file backend only).
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: "data".to_string(),
        }
    }
}

/// Game rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    /// Battle pass XP required per tier.
    pub xp_per_tier: u64,

    /// Highest battle pass tier.
    pub max_tier: u32,

    /// Maximum members per clan.
    pub clan_max_members: usize,

    /// Length of a season in days.
    pub season_length_days: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            xp_per_tier: 1_000,
            max_tier: 50,
            clan_max_members: 30,
            season_length_days: 56,
        }
    }
}
