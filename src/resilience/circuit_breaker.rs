//! Circuit breaker for a volatile downstream dependency.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: one trial call probes recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: reset_timeout elapsed since opened_at (checked lazily)
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (fresh opened_at)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, shared through `Arc`
//! - Every transition is computed under a single mutex; the lock is never held across an await
//! - Admission hands out a [`CallPermit`] stamped with the breaker generation, so outcomes
//!   reported after a transition cannot drive another one
//! - A trial permit dropped without an outcome frees the Half-Open slot

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used for the `breaker_state` gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Thresholds for a single breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,
    /// Time spent Open before a trial is allowed.
    pub reset_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            reset_timeout: Duration::try_from_secs_f64(config.reset_timeout_secs)
                .unwrap_or(Self::default().reset_timeout),
        }
    }
}

/// Lifetime counters of a breaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BreakerStats {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
    pub state_changes: u64,
}

/// Point-in-time view of a breaker, as reported by `vendor_state`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failures: u32,
    /// Unix timestamp (seconds) of the last transition to Open.
    pub opened_at: Option<f64>,
    pub open_for_secs: f64,
    pub failure_threshold: u32,
    pub reset_timeout_secs: f64,
    pub trial_in_flight: bool,
    pub stats: BreakerStats,
}

/// The breaker refused to admit a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circuit '{breaker}' is {state}")]
pub struct CircuitOpenError {
    pub breaker: String,
    /// `Open`, or `HalfOpen` with a trial already in flight.
    pub state: CircuitState,
    /// Time left until a trial may be admitted, when known.
    pub retry_after: Option<Duration>,
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    opened_at_wall: Option<SystemTime>,
    trial_in_flight: bool,
    generation: u64,
    stats: BreakerStats,
}

/// Thread-safe circuit breaker.
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a Closed breaker.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        Self {
            name,
            settings,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                opened_at_wall: None,
                trial_in_flight: false,
                generation: 0,
                stats: BreakerStats::default(),
            }),
        }
    }

    /// Create from the `[breaker]` config section.
    pub fn from_config(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::new(name, BreakerSettings::from(config))
    }

    /// Current state, applying a due Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        inner.state
    }

    /// Current state and counters.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);

        let open_for_secs = match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => at.elapsed().as_secs_f64(),
            _ => 0.0,
        };

        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failures: inner.consecutive_failures,
            opened_at: inner
                .opened_at_wall
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64()),
            open_for_secs,
            failure_threshold: self.settings.failure_threshold,
            reset_timeout_secs: self.settings.reset_timeout.as_secs_f64(),
            trial_in_flight: inner.trial_in_flight,
            stats: inner.stats.clone(),
        }
    }

    /// Ask to run one downstream call.
    ///
    /// Closed admits everyone. Half-Open admits a single trial at a time.
    /// Open rejects until `reset_timeout` has elapsed.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, CircuitOpenError> {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);

        match inner.state {
            CircuitState::Closed => {
                inner.stats.calls += 1;
                Ok(CallPermit::new(self, inner.generation, false))
            }
            CircuitState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                inner.stats.calls += 1;
                tracing::debug!(breaker = %self.name, "Admitting half-open trial call");
                Ok(CallPermit::new(self, inner.generation, true))
            }
            state => {
                inner.stats.rejections += 1;
                metrics::record_breaker_rejection(&self.name);
                let retry_after = match (state, inner.opened_at) {
                    (CircuitState::Open, Some(at)) => {
                        Some(self.settings.reset_timeout.saturating_sub(at.elapsed()))
                    }
                    _ => None,
                };
                Err(CircuitOpenError {
                    breaker: self.name.clone(),
                    state,
                    retry_after,
                })
            }
        }
    }

    fn on_success(&self, generation: u64, trial: bool) {
        let mut inner = self.inner.lock();
        inner.stats.successes += 1;
        if generation != inner.generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen if trial => self.transition(&mut inner, CircuitState::Closed),
            _ => {}
        }
    }

    fn on_failure(&self, generation: u64, trial: bool) {
        let mut inner = self.inner.lock();
        inner.stats.failures += 1;
        if generation != inner.generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.settings.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen if trial => {
                inner.consecutive_failures += 1;
                self.transition(&mut inner, CircuitState::Open);
            }
            _ => {}
        }
    }

    fn release_trial(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if generation == inner.generation && inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }

    fn refresh(&self, inner: &mut BreakerInner) {
        if inner.state != CircuitState::Open {
            return;
        }
        if let Some(at) = inner.opened_at {
            if at.elapsed() >= self.settings.reset_timeout {
                self.transition(inner, CircuitState::HalfOpen);
            }
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }

        inner.state = to;
        inner.generation += 1;
        inner.stats.state_changes += 1;
        inner.trial_in_flight = false;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.opened_at_wall = Some(SystemTime::now());
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.opened_at_wall = None;
            }
            CircuitState::HalfOpen => {}
        }

        tracing::warn!(
            breaker = %self.name,
            from = %from,
            to = %to,
            failures = inner.consecutive_failures,
            "Circuit state changed"
        );
        metrics::record_breaker_transition(&self.name, to);
    }
}

/// Admission ticket for one downstream call.
///
/// Report the outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). Dropping it unreported counts as
/// neither, and frees the Half-Open trial slot.
#[must_use = "report the call outcome through the permit"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64, trial: bool) -> Self {
        Self {
            breaker,
            generation,
            trial,
            settled: false,
        }
    }

    /// Whether this is the Half-Open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.generation, self.trial);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.generation, self.trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial(self.generation);
        }
    }
}
