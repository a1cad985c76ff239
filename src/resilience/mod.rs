//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a volatile dependency:
//!     → circuit_breaker.rs (gate: fail fast while Open, one trial while Half-Open)
//!     → timeouts.rs (per-attempt deadline)
//!     → retries.rs (retry allow-listed errors with backoff.rs delays)
//!     → circuit_breaker.rs (record each attempt outcome)
//! ```
//!
//! # Design Decisions
//! - Composition over interception: callers wrap an operation explicitly
//! - Breaker state is owned by one guarded structure per dependency and
//!   injected into its client, never reached through a global
//! - Unclassified errors are not retried
//! - No lock is held across a backoff sleep or a downstream await

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerSettings, BreakerSnapshot, BreakerStats, CallPermit, CircuitBreaker, CircuitOpenError,
    CircuitState,
};
pub use retries::{
    AttemptOutcome, Retried, RetryAttempt, RetryError, RetryPolicy, RetrySummary, Retryable,
};
pub use timeouts::{with_deadline, DeadlineExceeded};
