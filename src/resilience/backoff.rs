//! Exponential backoff with jitter.

use std::ops::Range;
use std::time::Duration;
use rand::Rng;

/// Multiplier range drawn for every non-zero delay.
pub const JITTER_RANGE: Range<f64> = 0.5..1.5;

/// Delay before `attempt` (1-based) without jitter.
///
/// The first attempt runs immediately; attempt `k >= 2` waits
/// `min(base * 2^(k-2), max)`.
pub fn capped_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }

    let factor = 2u32.checked_pow(attempt - 2).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Calculate the jittered backoff delay before `attempt`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let capped = capped_delay(attempt, base, max);
    if capped.is_zero() {
        return capped;
    }

    let jitter = rand::thread_rng().gen_range(JITTER_RANGE);
    capped.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_millis(1000);

    #[test]
    fn test_first_attempt_has_no_delay() {
        assert_eq!(capped_delay(1, BASE, MAX), Duration::ZERO);
        assert_eq!(calculate_backoff(1, BASE, MAX), Duration::ZERO);
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        assert_eq!(capped_delay(2, BASE, MAX), Duration::from_millis(100));
        assert_eq!(capped_delay(3, BASE, MAX), Duration::from_millis(200));
        assert_eq!(capped_delay(4, BASE, MAX), Duration::from_millis(400));
        assert_eq!(capped_delay(5, BASE, MAX), Duration::from_millis(800));
        assert_eq!(capped_delay(6, BASE, MAX), MAX);
        assert_eq!(capped_delay(60, BASE, MAX), MAX);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        for attempt in 2..8 {
            let capped = capped_delay(attempt, BASE, MAX);
            for _ in 0..50 {
                let delay = calculate_backoff(attempt, BASE, MAX);
                assert!(delay >= capped.mul_f64(0.5), "{:?} below half of {:?}", delay, capped);
                assert!(delay < capped.mul_f64(1.5), "{:?} above 1.5x of {:?}", delay, capped);
            }
        }
    }
}
