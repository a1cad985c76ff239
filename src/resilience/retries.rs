//! Retry logic.
//!
//! # Responsibilities
//! - Invoke an operation up to `max_attempts` times
//! - Stop early when the next backoff would overrun the optional `max_elapsed` budget
//! - Sleep a jittered exponential backoff before every attempt after the first
//! - Retry only the errors the policy's predicate allows
//!
//! # Design Decisions
//! - The predicate travels with the policy, so each call site states what is transient
//! - Errors outside the allow-list abort immediately and propagate
//! - Nothing is held across the backoff sleep; each attempt starts from scratch

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// Whether this error is transient.
    fn is_retryable(&self) -> bool;
}

/// What happened on a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Failed with an allow-listed error.
    Failure,
    /// Failed with an error outside the allow-list.
    Aborted,
}

/// Record of one attempt, handed to the observer of [`RetryPolicy::execute_observed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt index.
    pub index: u32,
    /// Backoff slept before this attempt.
    pub delay: Duration,
    pub outcome: AttemptOutcome,
    /// No further attempt follows.
    pub terminal: bool,
}

/// A successful value together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Failure of a retried operation.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("retry exhausted after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// An attempt failed with an error the policy does not retry.
    #[error("non-retryable failure on attempt {attempts}: {error}")]
    Aborted { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The last underlying error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
            RetryError::Aborted { error, .. } => error,
        }
    }
}

/// Serializable view of a policy's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySummary {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_elapsed_ms: Option<u64>,
}

/// Bounded exponential-backoff retry executor.
pub struct RetryPolicy<E> {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_elapsed: Option<Duration>,
    retryable: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            max_elapsed: self.max_elapsed,
            retryable: Arc::clone(&self.retryable),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("max_elapsed", &self.max_elapsed)
            .finish_non_exhaustive()
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy. `max_attempts` is clamped to at least one.
    pub fn new<P>(max_attempts: u32, base_delay: Duration, max_delay: Duration, retryable: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            max_elapsed: None,
            retryable: Arc::new(retryable),
        }
    }

    /// Build from the `[retries]` config section.
    pub fn from_config<P>(config: &RetryConfig, retryable: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let budget = (config.max_elapsed_ms > 0).then(|| Duration::from_millis(config.max_elapsed_ms));
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            retryable,
        )
        .with_max_elapsed(budget)
    }

    /// Bound the total time spent across attempts and backoff sleeps.
    ///
    /// No sleep is started that would end past the budget; the last failure
    /// is then reported as [`RetryError::Exhausted`].
    pub fn with_max_elapsed(mut self, budget: Option<Duration>) -> Self {
        self.max_elapsed = budget;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn summary(&self) -> RetrySummary {
        let millis = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        RetrySummary {
            max_attempts: self.max_attempts,
            base_delay_ms: millis(self.base_delay),
            max_delay_ms: millis(self.max_delay),
            max_elapsed_ms: self.max_elapsed.map(millis),
        }
    }

    /// Same policy with the attempt budget capped at `cap`.
    pub fn capped(&self, cap: u32) -> Self {
        let mut policy = self.clone();
        policy.max_attempts = self.max_attempts.min(cap.max(1));
        policy
    }

    /// Same schedule for a wrapping error type `U`.
    ///
    /// A `U` is retried when `project` finds an `E` inside it that this
    /// policy retries; anything else is not retried.
    pub fn lift<U, F>(&self, project: F) -> RetryPolicy<U>
    where
        E: 'static,
        U: 'static,
        F: Fn(&U) -> Option<&E> + Send + Sync + 'static,
    {
        let inner = Arc::clone(&self.retryable);
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            max_elapsed: self.max_elapsed,
            retryable: Arc::new(move |u: &U| project(u).is_some_and(|e| inner(e))),
        }
    }

    pub fn is_retryable(&self, error: &E) -> bool {
        (self.retryable)(error)
    }

    /// Jittered delay slept before `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay)
    }

    /// Run `op` under this policy. `op` receives the 1-based attempt index.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<Retried<T>, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_observed(op, |_| {}).await
    }

    /// Like [`execute`](Self::execute), reporting every attempt to `observer`.
    pub async fn execute_observed<F, Fut, T, O>(
        &self,
        mut op: F,
        mut observer: O,
    ) -> Result<Retried<T>, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        O: FnMut(&RetryAttempt),
        E: fmt::Display,
    {
        let started = tokio::time::Instant::now();
        let mut attempt = 1;
        let mut delay = Duration::ZERO;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    observer(&RetryAttempt {
                        index: attempt,
                        delay,
                        outcome: AttemptOutcome::Success,
                        terminal: true,
                    });
                    if attempt > 1 {
                        tracing::debug!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(Retried { value, attempts: attempt });
                }
                Err(error) => {
                    if !self.is_retryable(&error) {
                        observer(&RetryAttempt {
                            index: attempt,
                            delay,
                            outcome: AttemptOutcome::Aborted,
                            terminal: true,
                        });
                        tracing::debug!(attempt, error = %error, "Non-retryable failure");
                        return Err(RetryError::Aborted { attempts: attempt, error });
                    }

                    let next_delay = if attempt >= self.max_attempts {
                        None
                    } else {
                        let next = self.delay_for_attempt(attempt + 1);
                        match self.max_elapsed {
                            Some(budget) if started.elapsed() + next > budget => {
                                tracing::debug!(attempt, budget = ?budget, "Retry time budget spent");
                                None
                            }
                            _ => Some(next),
                        }
                    };

                    let terminal = next_delay.is_none();
                    observer(&RetryAttempt {
                        index: attempt,
                        delay,
                        outcome: AttemptOutcome::Failure,
                        terminal,
                    });

                    let Some(next) = next_delay else {
                        tracing::warn!(attempts = attempt, error = %error, "Retry attempts exhausted");
                        return Err(RetryError::Exhausted { attempts: attempt, last_error: error });
                    };

                    attempt += 1;
                    delay = next;
                    tracing::debug!(attempt, delay = ?delay, error = %error, "Retrying after transient failure");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl<E: Retryable> RetryPolicy<E> {
    /// Policy whose allow-list is [`Retryable::is_retryable`].
    pub fn for_retryable(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self::new(max_attempts, base_delay, max_delay, |e: &E| e.is_retryable())
    }
}
