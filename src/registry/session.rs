//! Stream sessions
//!
//! A session owns everything needed to serve one piece of content: the pool
//! its subscribers register with and the loop that feeds that pool.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::content::AudioContent;
use crate::pool::{ConnectionPool, PoolConfig};
use crate::stats::LoopStats;
use crate::streaming::{StreamConfig, StreamingLoop};

/// A running stream: content, pool and streaming loop
pub struct StreamSession {
    label: String,
    pool: Arc<ConnectionPool>,
    token: CancellationToken,
    handle: JoinHandle<LoopStats>,
}

impl StreamSession {
    /// Create a pool for `content` and start its streaming loop
    ///
    /// The loop stops when `token` (or a parent of it) is cancelled, or when
    /// [`stop`](Self::stop) is called.
    pub fn start(
        content: AudioContent,
        pool_config: PoolConfig,
        stream_config: StreamConfig,
        token: CancellationToken,
    ) -> Self {
        let label = content.origin().to_string();
        let pool = Arc::new(ConnectionPool::with_config(pool_config));
        let handle = StreamingLoop::new(content, Arc::clone(&pool), stream_config).spawn(token.clone());

        Self {
            label,
            pool,
            token,
            handle,
        }
    }

    /// Label of the content being streamed
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Pool that subscribers of this session register with
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.pool.subscriber_count()
    }

    /// Check if the streaming loop is still running
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the loop, evict all subscribers and wait for the loop to finish
    pub async fn stop(self) -> Option<LoopStats> {
        self.token.cancel();
        let evicted = self.pool.clear();
        let pool_stats = self.pool.stats();

        match self.handle.await {
            Ok(stats) => {
                tracing::info!(
                    stream = %self.label,
                    evicted = evicted,
                    ticks = stats.ticks,
                    dropped = pool_stats.chunks_dropped,
                    drop_ratio = pool_stats.drop_ratio(),
                    "Stream session stopped"
                );
                Some(stats)
            }
            Err(e) => {
                tracing::warn!(stream = %self.label, error = %e, "Streaming loop task failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("label", &self.label)
            .field("subscribers", &self.subscriber_count())
            .field("running", &self.is_running())
            .finish()
    }
}
