//! Gateway configuration.

use std::time::Duration;
use syncbridge_protocol::DEFAULT_RETRY_AFTER_SECS;

/// Configuration for [`Gateway`](crate::Gateway).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Bound on one call to the sync backend.
    pub upstream_timeout: Duration,
    /// `Retry-After` sent with 503 responses when the backend gave none.
    pub retry_after: Duration,
}

impl GatewayConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(30),
            retry_after: Duration::from_secs(DEFAULT_RETRY_AFTER_SECS),
        }
    }

    /// Sets the upstream timeout.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Sets the default `Retry-After`.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}
