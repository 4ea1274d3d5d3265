//! Nonce bookkeeping and signature verification.

use alloy::primitives::{hex, Address, Signature};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::auth::message::SiweMessage;
use crate::auth::{SiweError, SiweResult};
use crate::config::AuthConfig;

const NONCE_LEN: usize = 17;

/// A verified wallet sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub address: Address,
    pub chain_id: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues nonces and turns signed messages into sessions.
#[derive(Debug)]
pub struct SiweAuthenticator {
    config: AuthConfig,
    /// Outstanding nonces and when they stop being accepted.
    nonces: DashMap<String, DateTime<Utc>>,
}

impl SiweAuthenticator {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            nonces: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Generate a fresh nonce valid for `nonce_ttl_secs` from `now`.
    pub fn issue_nonce(&self, now: DateTime<Utc>) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();

        let expires = now + Duration::seconds(self.config.nonce_ttl_secs as i64);
        self.nonces.insert(nonce.clone(), expires);
        tracing::debug!(expires = %expires, "Issued sign-in nonce");
        nonce
    }

    /// Number of nonces waiting to be used.
    pub fn pending_nonces(&self) -> usize {
        self.nonces.len()
    }

    /// Verify a signed message and open a session.
    ///
    /// The nonce is consumed as soon as the message passes the domain and
    /// chain checks, so a failed signature cannot be retried with the same
    /// nonce.
    pub fn verify(&self, message_text: &str, signature_hex: &str, now: DateTime<Utc>) -> SiweResult<AuthSession> {
        let message: SiweMessage = message_text.parse()?;

        if message.version != "1" {
            return Err(SiweError::UnsupportedVersion(message.version));
        }
        if message.domain != self.config.domain {
            return Err(SiweError::DomainMismatch {
                expected: self.config.domain.clone(),
                actual: message.domain,
            });
        }
        if message.uri != self.config.uri {
            return Err(SiweError::UriMismatch {
                expected: self.config.uri.clone(),
                actual: message.uri,
            });
        }
        if message.chain_id != self.config.chain_id {
            return Err(SiweError::ChainMismatch {
                expected: self.config.chain_id,
                actual: message.chain_id,
            });
        }

        let (_, nonce_expires) = self.nonces.remove(&message.nonce).ok_or(SiweError::UnknownNonce)?;
        if now >= nonce_expires {
            return Err(SiweError::NonceExpired);
        }

        if let Some(not_before) = &message.not_before {
            if now < not_before.instant() {
                return Err(SiweError::NotYetValid);
            }
        }
        if let Some(expiration) = &message.expiration_time {
            if now >= expiration.instant() {
                return Err(SiweError::Expired);
            }
        }

        let recovered = recover_signer(message_text, signature_hex)?;
        if recovered != message.address {
            tracing::warn!(
                expected = %message.address,
                recovered = %recovered,
                "Sign-in signature does not match message address"
            );
            return Err(SiweError::SignerMismatch {
                expected: message.address,
                recovered,
            });
        }

        let session_end = now + Duration::seconds(self.config.session_ttl_secs as i64);
        let expires_at = match &message.expiration_time {
            Some(expiration) => expiration.instant().min(session_end),
            None => session_end,
        };

        tracing::info!(address = %message.address, chain_id = message.chain_id, "Wallet signed in");

        Ok(AuthSession {
            address: message.address,
            chain_id: message.chain_id,
            issued_at: now,
            expires_at,
        })
    }

    /// Drop nonces that can no longer be used. Returns how many were removed.
    pub fn purge_expired_nonces(&self, now: DateTime<Utc>) -> usize {
        let before = self.nonces.len();
        self.nonces.retain(|_, expires| *expires > now);
        let purged = before - self.nonces.len();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired nonces");
        }
        purged
    }
}

/// Recover the EIP-191 personal-sign signer of `message`.
fn recover_signer(message: &str, signature_hex: &str) -> SiweResult<Address> {
    let bytes = hex::decode(signature_hex.trim()).map_err(|e| SiweError::InvalidSignature(e.to_string()))?;
    let signature = Signature::from_raw(&bytes).map_err(|e| SiweError::InvalidSignature(e.to_string()))?;
    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| SiweError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;
    use chrono::TimeZone;

    const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn auth() -> SiweAuthenticator {
        SiweAuthenticator::new(AuthConfig {
            domain: "play.example.org".to_string(),
            uri: "https://play.example.org".to_string(),
            chain_id: 1,
            nonce_ttl_secs: 300,
            session_ttl_secs: 3_600,
        })
    }

    fn signer() -> PrivateKeySigner {
        ANVIL_KEY.parse().unwrap()
    }

    fn message_for(signer: &PrivateKeySigner, nonce: &str) -> SiweMessage {
        let mut message = SiweMessage::new(
            "play.example.org",
            signer.address(),
            "https://play.example.org",
            1,
            nonce,
            now(),
        );
        message.statement = Some("Sign in to Kickoff".to_string());
        message
    }

    fn sign(signer: &PrivateKeySigner, text: &str) -> String {
        let signature = signer.sign_message_sync(text.as_bytes()).unwrap();
        hex::encode_prefixed(signature.as_bytes())
    }

    #[test]
    fn test_nonce_shape() {
        let auth = auth();
        let nonce = auth.issue_nonce(now());
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(auth.pending_nonces(), 1);
    }

    #[test]
    fn test_verify_opens_session() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let text = message_for(&signer, &nonce).to_string();
        let signature = sign(&signer, &text);

        let session = auth.verify(&text, &signature, now()).unwrap();
        assert_eq!(session.address, signer.address());
        assert_eq!(session.chain_id, 1);
        assert_eq!(session.expires_at, now() + Duration::seconds(3_600));
        assert_eq!(auth.pending_nonces(), 0);
    }

    #[test]
    fn test_replay_is_rejected() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let text = message_for(&signer, &nonce).to_string();
        let signature = sign(&signer, &text);

        auth.verify(&text, &signature, now()).unwrap();
        assert_eq!(auth.verify(&text, &signature, now()), Err(SiweError::UnknownNonce));
    }

    #[test]
    fn test_unknown_nonce() {
        let auth = auth();
        let signer = signer();
        let text = message_for(&signer, "neverissued1").to_string();
        let signature = sign(&signer, &text);
        assert_eq!(auth.verify(&text, &signature, now()), Err(SiweError::UnknownNonce));
    }

    #[test]
    fn test_expired_nonce() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let text = message_for(&signer, &nonce).to_string();
        let signature = sign(&signer, &text);

        let later = now() + Duration::seconds(301);
        assert_eq!(auth.verify(&text, &signature, later), Err(SiweError::NonceExpired));
    }

    #[test]
    fn test_wrong_domain_keeps_nonce() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let mut message = message_for(&signer, &nonce);
        message.domain = "evil.example.org".to_string();
        let text = message.to_string();
        let signature = sign(&signer, &text);

        assert!(matches!(
            auth.verify(&text, &signature, now()),
            Err(SiweError::DomainMismatch { .. })
        ));
        assert_eq!(auth.pending_nonces(), 1);
    }

    #[test]
    fn test_wrong_chain() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let mut message = message_for(&signer, &nonce);
        message.chain_id = 137;
        let text = message.to_string();
        let signature = sign(&signer, &text);

        assert_eq!(
            auth.verify(&text, &signature, now()),
            Err(SiweError::ChainMismatch { expected: 1, actual: 137 })
        );
    }

    #[test]
    fn test_signature_from_other_wallet() {
        let auth = auth();
        let owner = signer();
        let other = PrivateKeySigner::random();
        let nonce = auth.issue_nonce(now());
        let text = message_for(&owner, &nonce).to_string();
        let signature = sign(&other, &text);

        assert_eq!(
            auth.verify(&text, &signature, now()),
            Err(SiweError::SignerMismatch {
                expected: owner.address(),
                recovered: other.address(),
            })
        );
    }

    #[test]
    fn test_garbage_signature() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let text = message_for(&signer, &nonce).to_string();
        assert!(matches!(
            auth.verify(&text, "0xdeadbeef", now()),
            Err(SiweError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_validity_window_enforced() {
        let auth = auth();
        let signer = signer();

        let nonce = auth.issue_nonce(now());
        let mut message = message_for(&signer, &nonce);
        message.not_before = Some((now() + Duration::minutes(1)).into());
        let text = message.to_string();
        let signature = sign(&signer, &text);
        assert_eq!(auth.verify(&text, &signature, now()), Err(SiweError::NotYetValid));

        let nonce = auth.issue_nonce(now());
        let mut message = message_for(&signer, &nonce);
        message.expiration_time = Some(now().into());
        let text = message.to_string();
        let signature = sign(&signer, &text);
        assert_eq!(auth.verify(&text, &signature, now()), Err(SiweError::Expired));
    }

    #[test]
    fn test_session_capped_by_message_expiration() {
        let auth = auth();
        let signer = signer();
        let nonce = auth.issue_nonce(now());
        let mut message = message_for(&signer, &nonce);
        let expiration = now() + Duration::minutes(10);
        message.expiration_time = Some(expiration.into());
        let text = message.to_string();
        let signature = sign(&signer, &text);

        let session = auth.verify(&text, &signature, now()).unwrap();
        assert_eq!(session.expires_at, expiration);
    }

    #[test]
    fn test_purge_expired_nonces() {
        let auth = auth();
        auth.issue_nonce(now());
        auth.issue_nonce(now() + Duration::seconds(200));

        assert_eq!(auth.purge_expired_nonces(now() + Duration::seconds(300)), 1);
        assert_eq!(auth.pending_nonces(), 1);
        assert_eq!(auth.purge_expired_nonces(now() + Duration::seconds(600)), 1);
        assert_eq!(auth.pending_nonces(), 0);
    }
}
