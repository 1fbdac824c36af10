//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
///
/// There is no default `host`; it must come from a later layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Scheduler port (default: 0, meaning plain HTTP on 80)
    pub port: u64,

    /// Attempts per HTTP request (default: 3)
    pub retry: u64,

    /// Pause between attempts in milliseconds (default: 1000)
    pub retry_delay_ms: u64,

    /// Connection timeout in seconds (default: 30)
    pub connect_timeout_seconds: u64,

    /// Pause between delete and recreate in seconds (default: 30)
    pub settle_seconds: u64,

    /// Pause between convergence polls in seconds (default: 5)
    pub poll_interval_seconds: u64,

    /// Convergence polls before giving up (default: 60)
    pub poll_max_attempts: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            port: 0,
            retry: 3,
            retry_delay_ms: 1000,
            connect_timeout_seconds: 30,
            settle_seconds: 30,
            poll_interval_seconds: 5,
            poll_max_attempts: 60,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "port": self.port,
            "retry": self.retry,
            "retry_delay_ms": self.retry_delay_ms,
            "connect_timeout_seconds": self.connect_timeout_seconds,
            "settle_seconds": self.settle_seconds,
            "poll": {
                "interval_seconds": self.poll_interval_seconds,
                "max_attempts": self.poll_max_attempts
            }
        })
    }
}
