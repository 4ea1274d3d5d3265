//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Detect duplicate endpoint names and unusable URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KickoffConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::schema::KickoffConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &KickoffConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.is_empty() {
        errors.push(ValidationError::new("endpoints", "no RPC endpoints configured"));
    }

    let mut names = HashSet::new();
    for (i, endpoint) in config.endpoints.iter().enumerate() {
        let field = format!("endpoints[{}]", i);
        if endpoint.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !names.insert(endpoint.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate endpoint name '{}'", endpoint.name),
            ));
        }

        match Url::parse(&endpoint.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("{}.url", field),
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("{}.url", field),
                format!("invalid URL '{}': {}", endpoint.url, e),
            )),
        }

        if endpoint.timeout_ms == Some(0) {
            errors.push(ValidationError::new(format!("{}.timeout_ms", field), "must be > 0"));
        }
    }

    let failover = &config.failover;
    if failover.unhealthy_threshold == 0 {
        errors.push(ValidationError::new("failover.unhealthy_threshold", "must be >= 1"));
    }
    if failover.check_interval_ms == 0 {
        errors.push(ValidationError::new("failover.check_interval_ms", "must be > 0"));
    }
    if failover.default_timeout_ms == 0 {
        errors.push(ValidationError::new("failover.default_timeout_ms", "must be > 0"));
    }
    if failover.retry_base_delay_ms > failover.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "failover.retry_base_delay_ms",
            "must not exceed retry_max_delay_ms",
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", config.observability.log_format),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }

    if config.game.xp_per_tier == 0 {
        errors.push(ValidationError::new("game.xp_per_tier", "must be > 0"));
    }
    if config.game.max_tier == 0 {
        errors.push(ValidationError::new("game.max_tier", "must be > 0"));
    }
    if config.game.clan_max_members < 2 {
        errors.push(ValidationError::new("game.clan_max_members", "must be >= 2"));
    }
    if config.game.season_length_days == 0 {
        errors.push(ValidationError::new("game.season_length_days", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EndpointSpec;

    fn endpoint(name: &str, url: &str) -> EndpointSpec {
        EndpointSpec {
            name: name.to_string(),
            url: url.to_string(),
            priority: 0,
            timeout_ms: None,
            max_retries: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = KickoffConfig::default();
        config.endpoints.push(endpoint("a", "http://localhost:8545"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = KickoffConfig::default();
        config.endpoints.push(endpoint("a", "http://localhost:8545"));
        config.endpoints.push(endpoint("a", "ws://localhost:8546"));
        config.endpoints.push(endpoint("", "not a url"));
        config.failover.unhealthy_threshold = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"endpoints[1].name"));
        assert!(fields.contains(&"endpoints[1].url"));
        assert!(fields.contains(&"endpoints[2].name"));
        assert!(fields.contains(&"endpoints[2].url"));
        assert!(fields.contains(&"failover.unhealthy_threshold"));
    }

    #[test]
    fn test_empty_endpoints_rejected() {
        let errors = validate_config(&KickoffConfig::default()).unwrap_err();
        assert_eq!(errors[0].to_string(), "endpoints: no RPC endpoints configured");
    }
}
