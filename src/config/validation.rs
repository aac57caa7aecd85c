//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports and timeouts non-zero, lists non-empty)
//! - Detect duplicate vhost patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Pattern syntax is checked later, when the routing table is compiled

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no bind addresses configured")]
    NoBindAddress,

    #[error("empty bind address at position {0}")]
    EmptyBindAddress(usize),

    #[error("listen port must be non-zero")]
    ZeroPort,

    #[error("request timeout must be non-zero")]
    ZeroRequestTimeout,

    #[error("vhost at position {0} has an empty pattern")]
    EmptyVhostPattern(usize),

    #[error("vhost '{0}' is declared more than once")]
    DuplicateVhost(String),

    #[error("vhost '{0}' has backend port 0")]
    ZeroBackendPort(String),

    #[error("vhost '{0}' has a rewrite rule with an empty pattern")]
    EmptyRulePattern(String),

    #[error("vhost '{0}' has a hook with an empty pattern")]
    EmptyHookPattern(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bind.is_empty() {
        errors.push(ValidationError::NoBindAddress);
    }
    for (i, addr) in config.bind.iter().enumerate() {
        if addr.trim().is_empty() {
            errors.push(ValidationError::EmptyBindAddress(i));
        }
    }

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let mut seen = HashSet::new();
    for (i, vhost) in config.vhosts.iter().enumerate() {
        if vhost.pattern.is_empty() {
            errors.push(ValidationError::EmptyVhostPattern(i));
            continue;
        }
        if !seen.insert(vhost.pattern.as_str()) {
            errors.push(ValidationError::DuplicateVhost(vhost.pattern.clone()));
        }
        if vhost.port == Some(0) {
            errors.push(ValidationError::ZeroBackendPort(vhost.pattern.clone()));
        }
        if vhost.rules.iter().any(|r| r.pattern.is_empty()) {
            errors.push(ValidationError::EmptyRulePattern(vhost.pattern.clone()));
        }
        if vhost.hooks.iter().any(|h| h.pattern.is_empty()) {
            errors.push(ValidationError::EmptyHookPattern(vhost.pattern.clone()));
        }
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
    use crate::config::schema::{RuleConfig, VhostConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.port = 0;
        config.timeouts.request_secs = 0;
        config.bind.clear();
        config.vhosts.push(VhostConfig::new("a", None, Some(0)));
        config.vhosts.push(VhostConfig::new("a", None, Some(1)));
        config.vhosts.push(VhostConfig::new("", None, Some(1)));
        let mut with_rule = VhostConfig::new("b", None, Some(1));
        with_rule.rules.push(RuleConfig {
            pattern: String::new(),
            target: "/".to_string(),
        });
        config.vhosts.push(with_rule);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NoBindAddress,
                ValidationError::ZeroPort,
                ValidationError::ZeroRequestTimeout,
                ValidationError::ZeroBackendPort("a".to_string()),
                ValidationError::DuplicateVhost("a".to_string()),
                ValidationError::EmptyVhostPattern(2),
                ValidationError::EmptyRulePattern("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = ProxyConfig::default();
        config.timeouts.request_secs = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroRequestTimeout]
        );
    }

    #[test]
    fn test_missing_backend_port_is_allowed() {
        let mut config = ProxyConfig::default();
        config.vhosts.push(VhostConfig::new("static", None, None));
        assert!(validate_config(&config).is_ok());
    }
}
