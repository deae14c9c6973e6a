//! # Reconnect backoff.
//!
//! The delay before reconnect attempt `n` (0-indexed) is
//! `first × factor^n`, clamped to `max`, then jittered. The base is derived
//! from the attempt number alone, so jitter never feeds back into later
//! delays.
//!
//! ```rust
//! use std::time::Duration;
//! use statusbridge::upstream::backoff::{BackoffPolicy, Jitter};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: Jitter::None,
//! };
//! assert_eq!(backoff.next(0), Duration::from_secs(1));
//! assert_eq!(backoff.next(3), Duration::from_secs(8));
//! assert_eq!(backoff.next(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Jitter {
    /// Use the exact backoff delay.
    None,
    /// Random delay in `[0, backoff_delay]`.
    #[default]
    Full,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Full => {
                let ms = delay.as_millis().min(u64::MAX as u128) as u64;
                if ms == 0 {
                    return Duration::ZERO;
                }
                Duration::from_millis(rand::rng().random_range(0..=ms))
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Base delay for the first retry.
    pub first: Duration,
    /// Cap on the un-jittered delay.
    pub max: Duration,
    /// Multiplicative growth per attempt.
    pub factor: f64,
    pub jitter: Jitter,
}

impl Default for BackoffPolicy {
    /// 1s base, 30s cap, doubling, full jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: Jitter::Full,
        }
    }
}

impl BackoffPolicy {
    pub fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            ..Self::default()
        }
    }

    /// Delay to sleep before reconnect attempt `attempt` (0-indexed).
    pub fn next(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.ceiling(attempt))
    }

    /// Un-jittered delay for `attempt`: `first × factor^attempt`, never above `max`.
    fn ceiling(&self, attempt: u32) -> Duration {
        // Anything past 2^64 is already beyond every useful cap.
        let exponent = attempt.min(64) as i32;
        let grown = self.first.as_secs_f64() * self.factor.powi(exponent);
        if grown.is_finite() && grown >= 0.0 {
            Duration::from_secs_f64(grown.min(self.max.as_secs_f64()))
        } else {
            self.max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(first_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter: Jitter::None,
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let backoff = exact(250, 60_000);
        let schedule: Vec<u64> = (0..6).map(|n| backoff.next(n).as_millis() as u64).collect();
        assert_eq!(schedule, vec![250, 500, 1_000, 2_000, 4_000, 8_000]);
    }

    #[test]
    fn test_reconnect_schedule_stops_growing_at_cap() {
        let backoff = BackoffPolicy {
            jitter: Jitter::None,
            ..BackoffPolicy::default()
        };
        let schedule: Vec<u64> = (0..8).map(|n| backoff.next(n).as_secs()).collect();
        assert_eq!(schedule, vec![1, 2, 4, 8, 16, 30, 30, 30]);
        assert_eq!(backoff.next(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_cap_wins_over_larger_first_delay() {
        assert_eq!(exact(10_000, 5_000).next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_jittered_delay_never_exceeds_ceiling() {
        let backoff = BackoffPolicy {
            jitter: Jitter::Full,
            ..exact(100, 3_000)
        };
        for attempt in 0..12 {
            let ceiling = backoff.ceiling(attempt);
            for _ in 0..20 {
                assert!(backoff.next(attempt) <= ceiling, "attempt {attempt}");
            }
        }
    }

    #[test]
    fn test_full_jitter_of_zero_is_zero() {
        assert_eq!(Jitter::Full.apply(Duration::ZERO), Duration::ZERO);
    }
}
