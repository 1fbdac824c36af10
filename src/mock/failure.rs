//! Failure Injection for the Mock Scheduler
//!
//! Per-route failures: canned error statuses, dropped connections and
//! delays, optionally limited to the first N calls.

use std::collections::HashMap;
use std::time::Duration;

use super::Route;

/// Failure configuration for a route
#[derive(Debug, Clone, Default)]
pub struct FailureConfig {
    /// Status to answer with instead of handling the request
    pub status: Option<u16>,
    /// Body sent with `status`
    pub body: Option<String>,
    /// Fail at the transport level (no response at all)
    pub disconnect: bool,
    /// Delay to add before responding
    pub delay: Option<Duration>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Answer with `status` and `body`
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Drop the connection
    pub fn disconnect() -> Self {
        Self {
            disconnect: true,
            ..Self::default()
        }
    }

    /// Only add delay
    pub fn delay(duration: Duration) -> Self {
        Self {
            delay: Some(duration),
            ..Self::default()
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector for the mock scheduler
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<Route, FailureConfig>,
    call_counts: HashMap<Route, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for a route, resetting its call count
    pub fn inject(&mut self, route: Route, config: FailureConfig) {
        self.configs.insert(route, config);
        self.call_counts.insert(route, 0);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Clear failure injection for one route
    pub fn clear_route(&mut self, route: Route) {
        self.configs.remove(&route);
        self.call_counts.remove(&route);
    }

    /// Count a call and return the failure to apply, if any
    pub fn check(&mut self, route: Route) -> Option<FailureConfig> {
        let config = self.configs.get(&route)?;
        let count = self.call_counts.entry(route).or_insert(0);
        *count += 1;

        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }
        Some(config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_failure() {
        let mut injector = FailureInjector::new();
        assert!(injector.check(Route::GetJob).is_none());

        injector.inject(Route::GetJob, FailureConfig::status(500, "boom"));
        let failure = injector.check(Route::GetJob).unwrap();
        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.body.as_deref(), Some("boom"));
        assert!(injector.check(Route::CreateJob).is_none());
    }

    #[test]
    fn test_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(Route::CreateDeploy, FailureConfig::status(409, "busy").with_fail_count(2));

        assert!(injector.check(Route::CreateDeploy).is_some());
        assert!(injector.check(Route::CreateDeploy).is_some());
        assert!(injector.check(Route::CreateDeploy).is_none());
    }

    #[test]
    fn test_clear_route() {
        let mut injector = FailureInjector::new();
        injector.inject(Route::DeleteJob, FailureConfig::disconnect());
        assert!(injector.check(Route::DeleteJob).unwrap().disconnect);

        injector.clear_route(Route::DeleteJob);
        assert!(injector.check(Route::DeleteJob).is_none());
    }
}
