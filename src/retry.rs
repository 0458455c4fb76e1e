//! Exponential backoff for retrying transient transport failures.
//!
//! The transport consults [`ExponentialBackoff`] after each failed attempt to
//! decide how long to wait, and whether the elapsed retry budget is spent.

use crate::Error;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked after every failed attempt that is about to be retried.
///
/// Receives the error of the failed attempt and the wait before the next one.
/// It is purely observational and cannot change whether the request is retried.
pub type Notify = Arc<dyn Fn(&Error, Duration) + Send + Sync>;

/// Exponential backoff with randomized jitter and an elapsed-time budget.
///
/// # Examples
///
/// ```
/// use fxiaoke::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// // Defaults: 200ms, 300ms, 450ms, ... capped at 5s, for up to 20s.
/// let backoff = ExponentialBackoff::default();
/// assert_eq!(backoff.interval_for_attempt(1), Duration::from_millis(200));
/// assert_eq!(backoff.interval_for_attempt(2), Duration::from_millis(300));
///
/// // Deterministic delays, useful in tests.
/// let fixed = ExponentialBackoff {
///     randomization_factor: 0.0,
///     ..ExponentialBackoff::default()
/// };
/// assert_eq!(
///     fixed.next_delay(1, Duration::ZERO),
///     Some(Duration::from_millis(200))
/// );
/// assert_eq!(fixed.next_delay(1, Duration::from_secs(20)), None);
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// The wait before the first retry.
    pub initial_interval: Duration,
    /// Factor applied to the interval after each attempt.
    pub multiplier: f64,
    /// Relative jitter; each wait is drawn from `interval * (1 ± factor)`.
    pub randomization_factor: f64,
    /// Upper bound on any single wait.
    pub max_interval: Duration,
    /// Once this much time has passed since the first attempt, stop retrying.
    pub max_elapsed_time: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(200),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Duration::from_secs(20),
        }
    }
}

impl ExponentialBackoff {
    /// Returns the un-randomized wait before the given retry.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first retry)
    pub fn interval_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let nanos = self.initial_interval.as_nanos() as f64 * factor;

        if !nanos.is_finite() || nanos >= self.max_interval.as_nanos() as f64 {
            self.max_interval
        } else {
            Duration::from_nanos(nanos.round() as u64)
        }
    }

    /// Returns the wait before the given retry, or `None` once the elapsed
    /// budget is spent.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed)
    /// * `elapsed` - Time since the first attempt started
    pub fn next_delay(&self, attempt: usize, elapsed: Duration) -> Option<Duration> {
        if elapsed >= self.max_elapsed_time {
            return None;
        }
        Some(self.randomize(self.interval_for_attempt(attempt)))
    }

    fn randomize(&self, interval: Duration) -> Duration {
        let factor = self.randomization_factor.clamp(0.0, 1.0);
        if factor == 0.0 {
            return interval;
        }

        let jitter = rand::thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
        interval.mul_f64(jitter).min(self.max_interval)
    }
}
