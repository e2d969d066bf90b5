//! Streaming loop configuration
//!
//! Cadence and chunk size are plain parameters; nothing is derived from the
//! audio encoding.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default number of bytes per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default time between chunks
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(250);

/// Streaming loop configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Maximum bytes read from the content per tick
    pub chunk_size: usize,

    /// Period of the emission timer
    pub tick_period: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

impl StreamConfig {
    /// Set the chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the tick period
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Nominal throughput in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        let millis = self.tick_period.as_millis() as u64;
        if millis > 0 {
            self.chunk_size as u64 * 1000 / millis
        } else {
            0
        }
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be non-zero".into()));
        }
        if self.tick_period.is_zero() {
            return Err(Error::Config("tick period must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();

        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.tick_period, Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bytes_per_second() {
        // 4096 bytes every 250ms
        assert_eq!(StreamConfig::default().bytes_per_second(), 16_384);
    }

    #[test]
    fn test_builder_chaining() {
        let config = StreamConfig::default()
            .chunk_size(1024)
            .tick_period(Duration::from_millis(100));

        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.tick_period, Duration::from_millis(100));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(StreamConfig::default().chunk_size(0).validate().is_err());
        assert!(StreamConfig::default()
            .tick_period(Duration::ZERO)
            .validate()
            .is_err());
    }
}
