//! Typed projections of the effective configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{HttpTransport, RetryPolicy, SingularityClient, TransportError};
use crate::poll::PollConfig;
use crate::reconcile::DEFAULT_SETTLE;

use super::effective::{ConfigError, EffectiveConfig};

/// Derive the endpoint URL from host and port.
///
/// Port 0 and 80 mean plain HTTP on the default port, 443 means HTTPS.
pub fn endpoint_url(host: &str, port: u16) -> String {
    match port {
        0 | 80 => format!("http://{}", host),
        443 => format!("https://{}", host),
        _ => format!("http://{}:{}", host, port),
    }
}

/// Everything needed to talk to the scheduler.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
}

impl ClientSettings {
    /// Build a client over a real HTTP transport.
    pub fn connect(&self) -> Result<SingularityClient, TransportError> {
        let transport = HttpTransport::new(&self.base_url, self.connect_timeout)?;
        Ok(SingularityClient::with_retry(Arc::new(transport), self.retry.clone()))
    }
}

/// Timing knobs of the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Pause between delete and recreate.
    pub settle: Duration,
    pub convergence: PollConfig,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            convergence: PollConfig::default(),
        }
    }
}

impl ReconcileSettings {
    /// No sleeping anywhere; for tests.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            convergence: PollConfig::default().with_interval(Duration::ZERO),
        }
    }
}

impl EffectiveConfig {
    /// Project the client settings.
    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        let host = self
            .get_str("host")
            .ok_or_else(|| ConfigError::ValidationError("host is required".to_string()))?;
        let port = self.get_u64("port").unwrap_or(0);
        let port = u16::try_from(port)
            .map_err(|_| ConfigError::ValidationError("port must be in [0, 65535]".to_string()))?;

        let retry = RetryPolicy::default()
            .with_attempts(self.get_u64("retry").unwrap_or(3) as u32)
            .with_delay(Duration::from_millis(self.get_u64("retry_delay_ms").unwrap_or(1000)));

        Ok(ClientSettings {
            base_url: endpoint_url(host.trim(), port),
            retry,
            connect_timeout: Duration::from_secs(self.get_u64("connect_timeout_seconds").unwrap_or(30)),
        })
    }

    /// Project the reconciler timing settings.
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        let defaults = ReconcileSettings::default();
        let mut convergence = defaults.convergence;
        if let Some(secs) = self.get_u64("poll.interval_seconds") {
            convergence = convergence.with_interval(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.get_u64("poll.max_attempts") {
            convergence = convergence.with_max_attempts(attempts as u32);
        }

        ReconcileSettings {
            settle: self
                .get_u64("settle_seconds")
                .map(Duration::from_secs)
                .unwrap_or(defaults.settle),
            convergence,
        }
    }
}
