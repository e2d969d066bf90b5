//! Periodic chunk emission
//!
//! One loop runs per stream session. It does not know or care how many
//! subscribers the pool has: with none, chunks are produced and discarded.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::config::StreamConfig;
use super::cursor::ChunkCursor;
use crate::content::AudioContent;
use crate::pool::ConnectionPool;
use crate::stats::LoopStats;

/// Slices content into chunks on a fixed cadence and broadcasts them
pub struct StreamingLoop {
    cursor: ChunkCursor,
    pool: Arc<ConnectionPool>,
    config: StreamConfig,
    label: String,
}

impl StreamingLoop {
    /// Create a loop over `content` feeding `pool`
    pub fn new(content: AudioContent, pool: Arc<ConnectionPool>, config: StreamConfig) -> Self {
        let label = content.origin().to_string();

        Self {
            cursor: ChunkCursor::new(content, config.chunk_size),
            pool,
            config,
            label,
        }
    }

    /// Run the loop on a new task until `token` is cancelled
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<LoopStats> {
        tokio::spawn(self.run(token))
    }

    /// Run the loop until `token` is cancelled
    ///
    /// The first chunk is emitted one period after the call, not immediately.
    pub async fn run(mut self, token: CancellationToken) -> LoopStats {
        let period = self.config.tick_period;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut buffer = BytesMut::with_capacity(self.config.chunk_size);
        let mut stats = LoopStats::default();

        tracing::info!(
            stream = %self.label,
            chunk_size = self.config.chunk_size,
            tick_ms = period.as_millis() as u64,
            bytes_per_sec = self.config.bytes_per_second(),
            "Streaming loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let passes = self.cursor.passes_completed();

            buffer.clear();
            buffer.extend_from_slice(self.cursor.next_window());

            if self.cursor.passes_completed() != passes {
                tracing::debug!(
                    stream = %self.label,
                    passes = self.cursor.passes_completed(),
                    "Content exhausted, restarting from offset 0"
                );
            }

            let outcome = self.pool.broadcast(&buffer);

            stats.ticks += 1;
            stats.bytes_emitted += buffer.len() as u64;

            tracing::trace!(
                stream = %self.label,
                bytes = buffer.len(),
                delivered = outcome.delivered,
                dropped = outcome.dropped,
                "Chunk broadcast"
            );
        }

        stats.passes_completed = self.cursor.passes_completed();

        tracing::info!(
            stream = %self.label,
            ticks = stats.ticks,
            passes = stats.passes_completed,
            "Streaming loop stopped"
        );

        stats
    }
}
