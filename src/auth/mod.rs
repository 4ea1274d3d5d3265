//! Wallet sign-in (EIP-4361, "Sign-In with Ethereum").
//!
//! # Data Flow
//! ```text
//! Client asks for a nonce
//!     → session.rs (issue_nonce, remembered with a TTL)
//! Client signs the rendered message with its wallet (personal_sign)
//!     → message.rs (parse canonical text)
//!     → session.rs (domain / chain / nonce / window checks, signer recovery)
//!     → AuthSession
//! ```
//!
//! # Security Constraints
//! - A nonce is consumed by the first verification attempt that reaches it
//! - Signatures are checked by recovering the signer, never by trusting the
//!   address in the message

pub mod message;
pub mod session;

use alloy::primitives::Address;
use thiserror::Error;

pub use message::{SiweMessage, SiweTime};
pub use session::{AuthSession, SiweAuthenticator};

/// Sign-in failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SiweError {
    #[error("malformed SIWE message: {0}")]
    Parse(String),

    #[error("unsupported SIWE version: {0}")]
    UnsupportedVersion(String),

    #[error("domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch { expected: String, actual: String },

    #[error("uri mismatch: expected {expected}, got {actual}")]
    UriMismatch { expected: String, actual: String },

    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("unknown or already used nonce")]
    UnknownNonce,

    #[error("nonce expired")]
    NonceExpired,

    #[error("message is not yet valid")]
    NotYetValid,

    #[error("message has expired")]
    Expired,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signer mismatch: message names {expected}, signature recovers {recovered}")]
    SignerMismatch { expected: Address, recovered: Address },
}

/// Result type for sign-in operations.
pub type SiweResult<T> = Result<T, SiweError>;
