//! Service configuration sections.
//!
//! Every section has `#[serde(default)]`, so a TOML file only names what it changes.

use serde::{Deserialize, Serialize};

/// Root configuration for the inventory service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Circuit breaker guarding the vendor dependency.
    pub breaker: BreakerConfig,

    /// Retry configuration for vendor calls.
    pub retries: RetryConfig,

    /// Vendor pricing dependency.
    pub vendor: VendorConfig,

    /// Warehouse ledger settings.
    pub ledger: LedgerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening.
    pub security: SecurityConfig,
}

/// Where the HTTP API listens.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Socket address for the inventory API.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline applied by the HTTP layer, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds spent open before a half-open trial.
    pub reset_timeout_secs: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout_secs: 15.0,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// First backoff step in milliseconds.
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,

    /// Total time budget across attempts and backoff in milliseconds (0 disables).
    pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            max_elapsed_ms: 5000,
        }
    }
}

/// Vendor pricing dependency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Base URL of the vendor price API (`{base_url}/prices/{id}`).
    pub base_url: String,

    /// Per-attempt deadline in milliseconds.
    pub timeout_ms: u64,

    /// Idle connections kept per vendor host.
    pub pool_max_idle: usize,

    /// Serve the simulated vendor under `/vendor-mock`.
    pub mock_enabled: bool,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/vendor-mock".to_string(),
            timeout_ms: 2000,
            pool_max_idle: 10,
            mock_enabled: true,
        }
    }
}

/// Warehouse ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Read/compute/write cycles tried by the atomic increment path.
    pub max_update_attempts: u32,

    /// Artificial store round-trip latency in milliseconds (0 disables).
    pub simulated_latency_ms: u64,

    /// Items provisioned at startup.
    pub seed: Vec<SeedItem>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_update_attempts: 5,
            simulated_latency_ms: 0,
            seed: vec![SeedItem { id: 1, quantity: 10 }],
        }
    }
}

/// A ledger row created at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SeedItem {
    pub id: u64,
    pub quantity: u64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Serve Prometheus metrics.
    pub metrics_enabled: bool,

    /// Socket address of the Prometheus exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
        }
    }
}
