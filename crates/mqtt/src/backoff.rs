//! Retry delay schedule for broker reconnection.
//!
//! Each failed attempt multiplies the delay until it saturates at a cap:
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max_delay)
//! ```
//!
//! With the agent defaults (5s initial, 2.0 multiplier, 60s cap) that is
//! 5s, 10s, 20s, 40s, 60s, 60s, … — gentle on a recovering broker without
//! stalling recovery for minutes. An attempt limit is optional; the agent
//! runs unlimited by default since a telemetry daemon should outlive broker
//! restarts.

use std::time::Duration;

use thiserror::Error;

/// Raised when a configured attempt limit has been spent.
#[derive(Debug, Error)]
pub enum BackoffError {
    /// The number of attempts reached the configured limit.
    #[error("maximum of {0} reconnect attempts exceeded")]
    AttemptsExhausted(u32),
}

/// Exponential backoff controller.
///
/// Owned mutably by the connection kernel; `next_sleep` advances the
/// schedule, `reset` rewinds it after a successful CONNACK.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    current_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    attempt: u32,
    max_attempts: Option<u32>,
}

impl Backoff {
    /// Creates a schedule with no attempt limit.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay: initial,
            current_delay: initial,
            max_delay: max,
            multiplier,
            attempt: 0,
            max_attempts: None,
        }
    }

    /// Caps the number of attempts. `limit` of zero keeps retries unlimited.
    pub fn with_max_attempts(mut self, limit: u32) -> Self {
        self.max_attempts = (limit > 0).then_some(limit);
        self
    }

    /// Rewinds the schedule after a successful connection.
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempt = 0;
    }

    /// Returns the delay to sleep before the next attempt and advances the
    /// schedule. Fails once a configured attempt limit is spent.
    pub fn next_sleep(&mut self) -> Result<Duration, BackoffError> {
        self.attempt += 1;
        if let Some(limit) = self.max_attempts {
            if self.attempt > limit {
                return Err(BackoffError::AttemptsExhausted(limit));
            }
        }

        let sleep = self.current_delay;
        let grown = self.current_delay.as_secs_f64() * self.multiplier;
        self.current_delay = Duration::from_secs_f64(grown).min(self.max_delay);
        Ok(sleep)
    }

    /// Attempts consumed since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay the next `next_sleep` call would return.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60), 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_until_the_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60), 2.0);

        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(5));
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(10));
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(20));
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(40));
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(60));
        // Saturated.
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn reset_rewinds_the_schedule() {
        let mut backoff = Backoff::default();
        backoff.next_sleep().unwrap();
        backoff.next_sleep().unwrap();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn attempt_limit_is_enforced() {
        let mut backoff = Backoff::default().with_max_attempts(2);

        assert!(backoff.next_sleep().is_ok());
        assert!(backoff.next_sleep().is_ok());
        let exhausted = backoff.next_sleep();
        assert!(matches!(
            exhausted,
            Err(BackoffError::AttemptsExhausted(2))
        ));
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let mut backoff = Backoff::default().with_max_attempts(0);
        for _ in 0..500 {
            assert!(backoff.next_sleep().is_ok());
        }
    }
}
