//! EIP-4361 message model, parser and renderer.
//!
//! ```text
//! {domain} wants you to sign in with your Ethereum account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: 1
//! Chain ID: {chain_id}
//! Nonce: {nonce}
//! Issued At: {issued_at}
//! Expiration Time: {expiration_time}
//! Not Before: {not_before}
//! Request ID: {request_id}
//! Resources:
//! - {resource}
//! ```
//! Lines after `Issued At` are optional. Without a statement the address is
//! followed by three line feeds.

use alloy::primitives::Address;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::auth::{SiweError, SiweResult};

const PREAMBLE: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";

/// Minimum nonce length accepted by the standard.
pub const MIN_NONCE_LEN: usize = 8;

/// An RFC 3339 timestamp that renders exactly as it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweTime {
    text: String,
    instant: DateTime<Utc>,
}

impl SiweTime {
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    fn parse(field: &'static str, text: &str) -> SiweResult<Self> {
        let instant = DateTime::parse_from_rfc3339(text)
            .map_err(|e| SiweError::Parse(format!("{}: {}", field, e)))?
            .with_timezone(&Utc);
        Ok(Self {
            text: text.to_string(),
            instant,
        })
    }
}

impl From<DateTime<Utc>> for SiweTime {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            text: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            instant,
        }
    }
}

impl fmt::Display for SiweTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A Sign-In with Ethereum message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: SiweTime,
    pub expiration_time: Option<SiweTime>,
    pub not_before: Option<SiweTime>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// Build a version-1 message with the required fields.
    pub fn new(
        domain: impl Into<String>,
        address: Address,
        uri: impl Into<String>,
        chain_id: u64,
        nonce: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: domain.into(),
            address,
            statement: None,
            uri: uri.into(),
            version: "1".to_string(),
            chain_id,
            nonce: nonce.into(),
            issued_at: issued_at.into(),
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: Vec::new(),
        }
    }

    /// True if `now` lies inside the message's validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let started = self.not_before.as_ref().map_or(true, |nb| now >= nb.instant);
        let not_expired = self.expiration_time.as_ref().map_or(true, |exp| now < exp.instant);
        started && not_expired
    }
}

/// Consume the next line, failing with a message naming what was expected.
fn next_line<'a>(lines: &mut std::iter::Peekable<std::str::Split<'a, char>>, expected: &str) -> SiweResult<&'a str> {
    lines
        .next()
        .ok_or_else(|| SiweError::Parse(format!("unexpected end of message, expected {}", expected)))
}

fn tagged<'a>(line: &'a str, tag: &str) -> SiweResult<&'a str> {
    line.strip_prefix(tag)
        .ok_or_else(|| SiweError::Parse(format!("expected '{}' line, got '{}'", tag.trim_end(), line)))
}

fn optional_tagged<'a>(
    lines: &mut std::iter::Peekable<std::str::Split<'a, char>>,
    tag: &str,
) -> Option<&'a str> {
    let value = lines.peek().copied().and_then(|line| line.strip_prefix(tag))?;
    lines.next();
    Some(value)
}

impl FromStr for SiweMessage {
    type Err = SiweError;

    fn from_str(s: &str) -> SiweResult<Self> {
        let s = s.strip_suffix('\n').unwrap_or(s);
        let mut lines = s.split('\n').peekable();

        let header = next_line(&mut lines, "preamble")?;
        let domain = header
            .strip_suffix(PREAMBLE)
            .ok_or_else(|| SiweError::Parse("missing preamble".to_string()))?;
        if domain.is_empty() || domain.contains(char::is_whitespace) {
            return Err(SiweError::Parse(format!("invalid domain '{}'", domain)));
        }

        let address_line = next_line(&mut lines, "address")?;
        let address = Address::parse_checksummed(address_line, None)
            .map_err(|e| SiweError::Parse(format!("address '{}': {}", address_line, e)))?;

        if !next_line(&mut lines, "blank line")?.is_empty() {
            return Err(SiweError::Parse("expected blank line after address".to_string()));
        }

        let statement = match lines.peek().copied() {
            Some("") => {
                lines.next();
                None
            }
            Some(line) if line.starts_with(URI_TAG) => None,
            Some(line) => {
                lines.next();
                if !next_line(&mut lines, "blank line")?.is_empty() {
                    return Err(SiweError::Parse("expected blank line after statement".to_string()));
                }
                Some(line.to_string())
            }
            None => return Err(SiweError::Parse("unexpected end of message".to_string())),
        };

        let uri = tagged(next_line(&mut lines, "URI")?, URI_TAG)?;
        Url::parse(uri).map_err(|e| SiweError::Parse(format!("uri: {}", e)))?;

        let version = tagged(next_line(&mut lines, "Version")?, VERSION_TAG)?;
        if version != "1" {
            return Err(SiweError::UnsupportedVersion(version.to_string()));
        }

        let chain_id = tagged(next_line(&mut lines, "Chain ID")?, CHAIN_ID_TAG)?
            .parse::<u64>()
            .map_err(|e| SiweError::Parse(format!("chain id: {}", e)))?;

        let nonce = tagged(next_line(&mut lines, "Nonce")?, NONCE_TAG)?;
        if nonce.len() < MIN_NONCE_LEN || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SiweError::Parse(format!("invalid nonce '{}'", nonce)));
        }

        let issued_at = SiweTime::parse(
            "issued at",
            tagged(next_line(&mut lines, "Issued At")?, ISSUED_AT_TAG)?,
        )?;

        let expiration_time = optional_tagged(&mut lines, EXPIRATION_TAG)
            .map(|t| SiweTime::parse("expiration time", t))
            .transpose()?;
        let not_before = optional_tagged(&mut lines, NOT_BEFORE_TAG)
            .map(|t| SiweTime::parse("not before", t))
            .transpose()?;
        let request_id = optional_tagged(&mut lines, REQUEST_ID_TAG).map(str::to_string);

        let mut resources = Vec::new();
        if lines.peek().copied() == Some(RESOURCES_TAG) {
            lines.next();
            while let Some(resource) = lines.peek().copied().and_then(|l| l.strip_prefix("- ")) {
                Url::parse(resource).map_err(|e| SiweError::Parse(format!("resource: {}", e)))?;
                resources.push(resource.to_string());
                lines.next();
            }
        }

        if let Some(extra) = lines.next() {
            return Err(SiweError::Parse(format!("unexpected line '{}'", extra)));
        }

        Ok(Self {
            domain: domain.to_string(),
            address,
            statement,
            uri: uri.to_string(),
            version: version.to_string(),
            chain_id,
            nonce: nonce.to_string(),
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.domain, PREAMBLE)?;
        writeln!(f, "{}", self.address.to_checksum(None))?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{}", statement)?;
        }
        writeln!(f)?;
        writeln!(f, "{}{}", URI_TAG, self.uri)?;
        writeln!(f, "{}{}", VERSION_TAG, self.version)?;
        writeln!(f, "{}{}", CHAIN_ID_TAG, self.chain_id)?;
        writeln!(f, "{}{}", NONCE_TAG, self.nonce)?;
        write!(f, "{}{}", ISSUED_AT_TAG, self.issued_at)?;
        if let Some(exp) = &self.expiration_time {
            write!(f, "\n{}{}", EXPIRATION_TAG, exp)?;
        }
        if let Some(nb) = &self.not_before {
            write!(f, "\n{}{}", NOT_BEFORE_TAG, nb)?;
        }
        if let Some(id) = &self.request_id {
            write!(f, "\n{}{}", REQUEST_ID_TAG, id)?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{}", RESOURCES_TAG)?;
            for resource in &self.resources {
                write!(f, "\n- {}", resource)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "play.example.org wants you to sign in with your Ethereum account:
0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266

Sign in to manage your squad.

URI: https://play.example.org/login
Version: 1
Chain ID: 1
Nonce: 32891756abcd
Issued At: 2026-03-01T16:25:24Z
Expiration Time: 2026-03-08T16:25:24.000Z
Not Before: 2026-03-01T16:25:24Z
Request ID: req-42
Resources:
- ipfs://bafybeiemxf5abjwjbikoz4mc3a3dla6ual3jsgpdr4cjr3oz3evfyavhwq/
- https://play.example.org/terms";

    #[test]
    fn test_parse_full_message() {
        let message: SiweMessage = FULL.parse().unwrap();
        assert_eq!(message.domain, "play.example.org");
        assert_eq!(
            message.address.to_checksum(None),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(message.statement.as_deref(), Some("Sign in to manage your squad."));
        assert_eq!(message.chain_id, 1);
        assert_eq!(message.nonce, "32891756abcd");
        assert_eq!(message.request_id.as_deref(), Some("req-42"));
        assert_eq!(message.resources.len(), 2);
        assert!(message.expiration_time.is_some());
    }

    #[test]
    fn test_render_is_byte_exact() {
        let message: SiweMessage = FULL.parse().unwrap();
        assert_eq!(message.to_string(), FULL);
    }

    #[test]
    fn test_without_statement() {
        let text = "localhost:3000 wants you to sign in with your Ethereum account:
0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266


URI: http://localhost:3000
Version: 1
Chain ID: 31337
Nonce: abcdefgh1234
Issued At: 2026-03-01T00:00:00Z";
        let message: SiweMessage = text.parse().unwrap();
        assert!(message.statement.is_none());
        assert_eq!(message.to_string(), text);
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let text = FULL.replace(
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266",
        );
        assert!(matches!(text.parse::<SiweMessage>(), Err(SiweError::Parse(_))));
    }

    #[test]
    fn test_rejects_short_nonce() {
        let text = FULL.replace("Nonce: 32891756abcd", "Nonce: abc");
        assert!(text.parse::<SiweMessage>().is_err());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let text = FULL.replace("Version: 1", "Version: 2");
        assert!(matches!(
            text.parse::<SiweMessage>(),
            Err(SiweError::UnsupportedVersion(v)) if v == "2"
        ));
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        let text = format!("{}\nextra", FULL);
        assert!(text.parse::<SiweMessage>().is_err());
    }

    #[test]
    fn test_validity_window() {
        let message: SiweMessage = FULL.parse().unwrap();
        let before: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();
        let during: DateTime<Utc> = "2026-03-02T00:00:00Z".parse().unwrap();
        let after: DateTime<Utc> = "2026-03-09T00:00:00Z".parse().unwrap();
        assert!(!message.is_valid_at(before));
        assert!(message.is_valid_at(during));
        assert!(!message.is_valid_at(after));
    }
}
