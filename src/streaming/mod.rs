//! Streaming loop
//!
//! Turns loaded [`AudioContent`](crate::content::AudioContent) into an endless,
//! paced sequence of chunks pushed into a
//! [`ConnectionPool`](crate::pool::ConnectionPool).
//!
//! ```text
//!   AudioContent ──► ChunkCursor ──tick──► pool.broadcast(chunk)
//!        ▲                │
//!        └── offset 0 ◄───┘ (content exhausted)
//! ```

pub mod config;
pub mod cursor;
pub mod task;

pub use config::StreamConfig;
pub use cursor::ChunkCursor;
pub use task::StreamingLoop;
