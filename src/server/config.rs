//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pool::PoolConfig;
use crate::streaming::StreamConfig;

/// Default content type of stream responses
pub const DEFAULT_CONTENT_TYPE: &str = "audio/aac";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent stream connections (0 = unlimited)
    pub max_connections: usize,

    /// How long shutdown waits for connections to finish
    pub shutdown_grace: Duration,

    /// Content-Type sent with stream responses
    pub content_type: String,

    /// Chunk size and cadence of every streaming loop
    pub stream: StreamConfig,

    /// Subscriber channel settings of every pool
    pub pool: PoolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            shutdown_grace: Duration::from_secs(5),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            stream: StreamConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set the stream content type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.stream.chunk_size = size;
        self
    }

    /// Set tick period
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.stream.tick_period = period;
        self
    }

    /// Set per-subscriber channel capacity
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.pool.subscriber_capacity = capacity;
        self
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;
        self.pool.validate()?;

        if self.content_type.is_empty()
            || self.content_type.contains(|c: char| c == '\r' || c == '\n')
        {
            return Err(Error::Config(format!(
                "invalid content type: {:?}",
                self.content_type
            )));
        }

        Ok(())
    }
}
