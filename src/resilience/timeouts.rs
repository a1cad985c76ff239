//! Per-attempt deadlines.
//!
//! # Responsibilities
//! - Bound every downstream attempt with a deadline
//! - Turn an expired deadline into the caller's own error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An attempt that exceeds its deadline is a failure like any other

use std::future::Future;
use std::time::Duration;

/// An attempt ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a deadline, converting expiry into `E`.
pub async fn with_deadline<F, T, E>(deadline: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(E::from(DeadlineExceeded(deadline))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Slow(Duration),
    }

    impl From<DeadlineExceeded> for TestError {
        fn from(e: DeadlineExceeded) -> Self {
            TestError::Slow(e.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_maps_to_error() {
        let deadline = Duration::from_millis(50);
        let result: Result<(), TestError> = with_deadline(deadline, async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(TestError::Slow(deadline)));
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result: Result<u32, TestError> =
            with_deadline(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
