//! # Backoff policy for retrying watch cycles.
//!
//! [`BackoffPolicy`] controls how long a watcher waits in `RetryScheduled`
//! before the next resolve attempt. It is parameterized by:
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for consecutive failure `n` (0-indexed) is `first × factor^n`,
//! clamped to `max`, then jitter is applied. The base delay is derived purely
//! from `n`, so jitter output never feeds back into later delays.
//!
//! The default is a constant one-second delay with no cap on the number of
//! retries: watchers never give up on their own.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use watchvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy::exponential(
//!     Duration::from_millis(100),
//!     Duration::from_secs(10),
//!     2.0,
//! );
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//!
//! assert_eq!(BackoffPolicy::default().next(7), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to spread out watchers that fail together.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant one-second delay:
    /// - `first = 1s`;
    /// - `factor = 1.0`;
    /// - `max = 30s`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self::constant(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Same delay after every failure.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay.max(Duration::from_secs(30)),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay grows by `factor` after every consecutive failure, capped at `max`.
    pub fn exponential(first: Duration, max: Duration, factor: f64) -> Self {
        Self {
            first,
            max,
            factor,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a copy with the given jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the delay after `failures` consecutive failures (0-indexed).
    ///
    /// # Notes
    /// - `factor == 1.0` keeps the delay constant at `first` (up to `max`).
    /// - Non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = failures.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        // `max_secs` rounds up for durations near `Duration::MAX`, so the
        // conversion itself can still overflow.
        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::try_from_secs_f64(unclamped_secs)
                    .unwrap_or(self.max)
                    .min(self.max)
            };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_is_constant_one_second() {
        let policy = BackoffPolicy::default();
        for failures in [0, 1, 2, 3, 100] {
            assert_eq!(policy.next(failures), Duration::from_secs(1));
        }
    }

    #[test]
    fn test_constant_with_long_delay_is_not_capped() {
        let policy = BackoffPolicy::constant(Duration::from_secs(45));
        assert_eq!(policy.next(5), Duration::from_secs(45));
    }

    #[test]
    fn test_exponential_doubles_until_cap() {
        let policy = BackoffPolicy::exponential(ms(250), Duration::from_secs(2), 2.0);
        let got: Vec<_> = (0..6).map(|n| policy.next(n)).collect();
        assert_eq!(got, vec![ms(250), ms(500), ms(1000), ms(2000), ms(2000), ms(2000)]);
    }

    #[test]
    fn test_first_above_max_clamps() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(10), Duration::from_secs(5), 2.0);
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_overflow_clamps_to_max() {
        let policy = BackoffPolicy::exponential(ms(100), Duration::from_secs(60), 2.0);
        assert_eq!(policy.next(100), Duration::from_secs(60));
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_unbounded_max_does_not_overflow() {
        assert_eq!(BackoffPolicy::constant(Duration::MAX).next(0), Duration::MAX);
        assert_eq!(BackoffPolicy::constant(Duration::MAX).next(3), Duration::MAX);

        let policy = BackoffPolicy::exponential(Duration::from_secs(1), Duration::MAX, 2.0);
        assert_eq!(policy.next(10), Duration::from_secs(1024));
        assert_eq!(policy.next(64), Duration::MAX);
        assert_eq!(policy.next(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_equal_jitter_stays_in_upper_half() {
        let policy = BackoffPolicy::constant(ms(1000)).with_jitter(JitterPolicy::Equal);
        for failures in 0..50 {
            let delay = policy.next(failures);
            assert!(delay >= ms(500) && delay <= ms(1000), "delay {delay:?}");
        }
    }

    #[test]
    fn test_full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy::exponential(ms(100), Duration::from_secs(30), 2.0)
            .with_jitter(JitterPolicy::Full);
        for failures in 0..12 {
            let base = ms(100 * 2u64.pow(failures)).min(Duration::from_secs(30));
            assert!(policy.next(failures) <= base);
        }
    }

    #[test]
    fn test_decorrelated_respects_floor_and_cap() {
        let policy = BackoffPolicy::exponential(ms(100), Duration::from_secs(5), 2.0)
            .with_jitter(JitterPolicy::Decorrelated);
        for _ in 0..100 {
            let delay = policy.next(8);
            assert!(delay >= ms(100) && delay <= Duration::from_secs(5), "delay {delay:?}");
        }
    }
}
