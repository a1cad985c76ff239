//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, delays ordered)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("{field}: {value} is not a representable duration")]
    DurationOutOfRange { field: &'static str, value: f64 },

    #[error("retries: base_delay_ms ({base}) exceeds max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("vendor.base_url: {0}")]
    InvalidUrl(String),

    #[error("ledger.seed: duplicate item id {0}")]
    DuplicateSeed(u64),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::MustBePositive { field: "timeouts.request_secs" });
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::MustBePositive { field: "breaker.failure_threshold" });
    }

    let reset = config.breaker.reset_timeout_secs;
    if !(reset.is_finite() && reset > 0.0) {
        errors.push(ValidationError::MustBePositive { field: "breaker.reset_timeout_secs" });
    } else if Duration::try_from_secs_f64(reset).is_err() {
        errors.push(ValidationError::DurationOutOfRange {
            field: "breaker.reset_timeout_secs",
            value: reset,
        });
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::MustBePositive { field: "retries.max_attempts" });
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    match Url::parse(&config.vendor.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::InvalidUrl(e.to_string())),
    }

    if config.vendor.timeout_ms == 0 {
        errors.push(ValidationError::MustBePositive { field: "vendor.timeout_ms" });
    }

    if config.ledger.max_update_attempts == 0 {
        errors.push(ValidationError::MustBePositive { field: "ledger.max_update_attempts" });
    }

    let mut seen = HashSet::new();
    for item in &config.ledger.seed {
        if !seen.insert(item.id) {
            errors.push(ValidationError::DuplicateSeed(item.id));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
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
    use crate::config::SeedItem;

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.breaker.failure_threshold = 0;
        config.breaker.reset_timeout_secs = f64::NAN;
        config.retries.base_delay_ms = 5000;
        config.vendor.base_url = "ftp://vendor".into();
        config.ledger.seed.push(SeedItem { id: 1, quantity: 3 });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6, "{:?}", errors);
        assert!(errors.contains(&ValidationError::DuplicateSeed(1)));
        assert!(errors.contains(&ValidationError::DelayOrder { base: 5000, max: 2000 }));
    }

    #[test]
    fn test_rejects_unrepresentable_reset_timeout() {
        let mut config = ServiceConfig::default();
        config.breaker.reset_timeout_secs = 1e20;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DurationOutOfRange {
                field: "breaker.reset_timeout_secs",
                value: 1e20,
            }]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
