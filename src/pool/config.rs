//! Connection pool configuration

use crate::error::{Error, Result};

/// Default per-subscriber channel capacity
///
/// A single slot means a subscriber only gets a chunk when it has finished
/// writing the previous one.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of chunks that can wait in a subscriber's channel
    pub subscriber_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Set the per-subscriber channel capacity
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        // tokio channels cannot be created with zero capacity
        if self.subscriber_capacity == 0 {
            return Err(Error::Config(
                "subscriber capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();

        assert_eq!(config.subscriber_capacity, DEFAULT_SUBSCRIBER_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_capacity() {
        let config = PoolConfig::default().subscriber_capacity(8);

        assert_eq!(config.subscriber_capacity, 8);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = PoolConfig::default().subscriber_capacity(0);

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
