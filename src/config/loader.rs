//! Configuration loading from disk and environment.

use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load the file if given (defaults otherwise), apply environment overrides, validate.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config: ServiceConfig = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => ServiceConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment-style settings onto `config`.
///
/// `lookup` resolves a variable name. Durations are given in (fractional)
/// seconds. A value that does not parse, or falls below the key's minimum,
/// is logged and the current value is kept.
pub fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    override_at_least(&lookup, "CB_FAILURE_THRESHOLD", &mut config.breaker.failure_threshold, 1);
    override_at_least(&lookup, "CB_RECOVERY_TIME", &mut config.breaker.reset_timeout_secs, 0.1);
    override_at_least(&lookup, "RETRY_ATTEMPTS", &mut config.retries.max_attempts, 1);
    override_secs_as_ms(&lookup, "RETRY_WAIT_MIN", &mut config.retries.base_delay_ms, 0.0);
    override_secs_as_ms(&lookup, "RETRY_WAIT_MAX", &mut config.retries.max_delay_ms, 0.1);
    override_secs_as_ms(&lookup, "VENDOR_RETRY_BUDGET", &mut config.retries.max_elapsed_ms, 0.1);
    override_secs_as_ms(&lookup, "VENDOR_TIMEOUT", &mut config.vendor.timeout_ms, 0.1);
    override_at_least(&lookup, "VENDOR_POOL_MAXSIZE", &mut config.vendor.pool_max_idle, 1);
    override_string(&lookup, "VENDOR_BASE_URL", &mut config.vendor.base_url);
    override_string(&lookup, "BIND_ADDRESS", &mut config.listener.bind_address);
    override_string(&lookup, "LOG_LEVEL", &mut config.observability.log_level);
}

fn override_string<F>(lookup: &F, key: &str, slot: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().to_string();
    }
}

fn override_at_least<F, T>(lookup: &F, key: &str, slot: &mut T, min: T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value >= min => *slot = value,
        Ok(_) => tracing::warn!(key, value = %raw, %min, "Environment override below minimum, keeping current value"),
        Err(_) => tracing::warn!(key, value = %raw, "Invalid environment override, keeping current value"),
    }
}

fn override_secs_as_ms<F>(lookup: &F, key: &str, slot_ms: &mut u64, min_secs: f64)
where
    F: Fn(&str) -> Option<String>,
{
    let mut secs = f64::NAN;
    override_at_least(lookup, key, &mut secs, min_secs);
    if secs.is_nan() {
        return;
    }

    match Duration::try_from_secs_f64(secs).ok().and_then(|d| u64::try_from(d.as_millis()).ok()) {
        Some(ms) => *slot_ms = ms,
        None => tracing::warn!(key, value = secs, "Environment override out of range, keeping current value"),
    }
}
