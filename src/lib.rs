//! Looping HTTP audio streaming
//!
//! `loopcast` loads an audio file into memory once and streams it, looped
//! forever, to any number of HTTP clients at a fixed pace.
//!
//! # Pipeline
//!
//! ```text
//! AudioContent ──► StreamingLoop ──► ConnectionPool::broadcast ──► ConnectionHandler ──► client
//!                  (every tick)      (try_send, drop if full)      (write + flush)
//! ```
//!
//! Slow clients never hold anyone up: a subscriber that has not consumed its
//! previous chunk simply misses the next one.
//!
//! # Example
//!
//! ```no_run
//! use loopcast::{AudioContent, ContentSource, ServerConfig, StreamServer};
//!
//! # async fn run() -> loopcast::Result<()> {
//! let content = AudioContent::load("./data/0001.aac").await?;
//! let server = StreamServer::new(ServerConfig::default(), ContentSource::Single(content))?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod error;
pub mod pool;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod streaming;

pub use content::AudioContent;
pub use error::{Error, Result};
pub use pool::{ConnectionPool, PoolConfig};
pub use registry::{ContentKey, RegistryConfig, SessionRegistry, StreamSession};
pub use server::{ConnectionHandler, ContentSource, ServerConfig, StreamServer, StreamSink};
pub use streaming::{StreamConfig, StreamingLoop};
