//! Broker configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::{BrokerError, BrokerResult};

/// Configuration for a [`ThreadBroker`](crate::ThreadBroker).
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
    default_wait_timeout: Duration,
    max_wait_timeout: Duration,
    event_capacity: NonZeroUsize,
}

impl BrokerConfig {
    /// Creates a configuration with the provided timeout bounds.
    #[must_use]
    pub fn new(default_wait_timeout: Duration, max_wait_timeout: Duration) -> Self {
        Self {
            default_wait_timeout,
            max_wait_timeout,
            event_capacity: NonZeroUsize::new(256).expect("non-zero"),
        }
    }

    /// Sets the broadcast capacity of the event channel.
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Timeout applied to waits that do not specify one.
    #[must_use]
    pub const fn default_wait_timeout(self) -> Duration {
        self.default_wait_timeout
    }

    /// Upper bound accepted for a single wait.
    #[must_use]
    pub const fn max_wait_timeout(self) -> Duration {
        self.max_wait_timeout
    }

    /// Capacity of the broadcast event channel.
    #[must_use]
    pub const fn event_capacity(self) -> NonZeroUsize {
        self.event_capacity
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Validation`] when the maximum wait timeout is
    /// zero or smaller than the default wait timeout.
    pub fn validate(self) -> BrokerResult<()> {
        if self.max_wait_timeout.is_zero() {
            return Err(BrokerError::validation(
                "max wait timeout must be greater than zero",
            ));
        }
        if self.default_wait_timeout > self.max_wait_timeout {
            return Err(BrokerError::validation(
                "default wait timeout cannot exceed max wait timeout",
            ));
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(30_000), Duration::from_millis(300_000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        BrokerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_timeouts() {
        let config = BrokerConfig::new(Duration::from_secs(60), Duration::from_secs(30));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_timeout() {
        let config = BrokerConfig::new(Duration::ZERO, Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
