//! Bounded convergence polling
//!
//! The scheduler acknowledges a deploy before it places tasks. The poller
//! re-checks a condition a fixed number of times, sleeping a fixed interval
//! before each check. Budgets are "attempts × interval", never wall-clock.

use std::time::Duration;

use tracing::debug;

/// Default pause before each convergence check.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of convergence checks.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;

/// Poll configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    /// Condition holds; stop polling.
    Ready(T),
    /// Condition does not hold yet; keep the observation.
    NotYet(T),
}

/// Result of a whole poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Converged { value: T, attempts: u32 },
    /// Attempts exhausted. `last` is the final observation, if any check ran.
    TimedOut { last: Option<T>, attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged { .. })
    }
}

/// Blocking, bounded poller
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergencePoller {
    config: PollConfig,
}

impl ConvergencePoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Run `check` up to `max_attempts` times, sleeping before each call.
    ///
    /// `check` receives the 1-based attempt number. An error from `check`
    /// aborts the poll immediately.
    pub fn poll<T, E, F>(&self, mut check: F) -> Result<PollOutcome<T>, E>
    where
        F: FnMut(u32) -> Result<Probe<T>, E>,
    {
        let mut last = None;
        for attempt in 1..=self.config.max_attempts {
            std::thread::sleep(self.config.interval);
            match check(attempt)? {
                Probe::Ready(value) => {
                    debug!(attempt, "converged");
                    return Ok(PollOutcome::Converged { value, attempts: attempt });
                }
                Probe::NotYet(value) => {
                    debug!(attempt, max_attempts = self.config.max_attempts, "not converged yet");
                    last = Some(value);
                }
            }
        }
        Ok(PollOutcome::TimedOut {
            last,
            attempts: self.config.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn fast(attempts: u32) -> ConvergencePoller {
        ConvergencePoller::new(PollConfig::default().with_interval(Duration::ZERO).with_max_attempts(attempts))
    }

    #[test]
    fn test_converges_on_third_check() {
        let outcome: Result<_, ()> = fast(5).poll(|attempt| {
            Ok(if attempt == 3 { Probe::Ready(attempt) } else { Probe::NotYet(attempt) })
        });
        assert_eq!(outcome.unwrap(), PollOutcome::Converged { value: 3, attempts: 3 });
    }

    #[test]
    fn test_timeout_keeps_last_observation() {
        let outcome: Result<_, ()> = fast(4).poll(|attempt| Ok(Probe::NotYet(attempt * 10)));
        assert_eq!(outcome.unwrap(), PollOutcome::TimedOut { last: Some(40), attempts: 4 });
    }

    #[test]
    fn test_zero_attempts_times_out_without_checking() {
        let mut calls = 0;
        let outcome: Result<PollOutcome<()>, ()> = fast(0).poll(|_| {
            calls += 1;
            Ok(Probe::Ready(()))
        });
        assert_eq!(calls, 0);
        assert_eq!(outcome.unwrap(), PollOutcome::TimedOut { last: None, attempts: 0 });
    }

    #[test]
    fn test_error_aborts() {
        let mut calls = 0;
        let outcome: Result<PollOutcome<()>, &str> = fast(5).poll(|_| {
            calls += 1;
            Err("gone")
        });
        assert_eq!(outcome.unwrap_err(), "gone");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_sleeps_before_each_check() {
        let poller = ConvergencePoller::new(
            PollConfig::default().with_interval(Duration::from_millis(10)).with_max_attempts(3),
        );
        let start = Instant::now();
        let outcome: Result<PollOutcome<()>, ()> = poller.poll(|_| Ok(Probe::NotYet(())));
        assert!(!outcome.unwrap().is_converged());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_attempts, DEFAULT_POLL_ATTEMPTS);
    }
}
