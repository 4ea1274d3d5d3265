//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → KickoffConfig (validated, immutable)
//!     → handed to AppContext::build, which wires every subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; endpoints never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, EndpointSpec, FailoverConfig, GameConfig, KickoffConfig,
    ObservabilityConfig, StorageBackend, StorageConfig,
};
