//! Connection handler
//!
//! Relays chunks from one subscriber channel to one client. The handler is
//! independent of the transport: anything implementing [`StreamSink`] can be
//! served, which is how the tests drive it without sockets.

use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::pool::{ConnectionPool, Subscriber};
use crate::session::{ConnectionContext, SubscriberState};
use crate::stats::{SubscriberStats, Termination};

/// Response metadata for a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHead {
    /// Content-Type of the audio payload
    pub content_type: String,
}

impl StreamHead {
    /// Create stream metadata with the given content type
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }
}

/// Output side of a streaming response
pub trait StreamSink: Send {
    /// Whether written data can be pushed to the client immediately
    fn supports_flush(&self) -> bool {
        true
    }

    /// Send the response head
    fn start(&mut self, head: &StreamHead) -> impl Future<Output = io::Result<()>> + Send;

    /// Write one chunk of payload
    fn write_chunk(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Push buffered data to the client
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// End the response cleanly
    fn finish(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Serves one client from a connection pool
pub struct ConnectionHandler {
    pool: Arc<ConnectionPool>,
    subscriber: Subscriber,
    context: ConnectionContext,
    head: StreamHead,
    shutdown: CancellationToken,
}

impl ConnectionHandler {
    /// Create a handler for one request
    ///
    /// `subscriber` must already be registered with `pool`; the handler
    /// unregisters it when the stream ends.
    pub fn new(
        pool: Arc<ConnectionPool>,
        subscriber: Subscriber,
        context: ConnectionContext,
        head: StreamHead,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            subscriber,
            context,
            head,
            shutdown,
        }
    }

    /// Relay chunks from the subscriber until the client goes away
    ///
    /// Returns [`Error::FlushUnsupported`] if the sink cannot flush and
    /// [`Error::DeliveryWrite`] when writing to the client fails. Shutdown
    /// and session close end the stream with `Ok`. The subscriber is
    /// unregistered on every path.
    pub async fn serve<S: StreamSink>(self, sink: &mut S) -> Result<SubscriberStats> {
        let ConnectionHandler {
            pool,
            mut subscriber,
            context: ctx,
            head,
            shutdown,
        } = self;
        let id = subscriber.id();
        let mut state = SubscriberState::new(id);

        if !sink.supports_flush() {
            pool.unregister(id);
            state.terminate(Termination::FlushUnsupported);
            tracing::warn!(
                session_id = ctx.session_id,
                peer = ?ctx.peer_addr,
                "Sink cannot flush, aborting stream request"
            );
            return Err(Error::FlushUnsupported);
        }

        if let Err(e) = sink.start(&head).await {
            pool.unregister(id);
            state.terminate(Termination::WriteFailed);
            return Err(Error::DeliveryWrite(e));
        }

        state.start_delivering();

        tracing::info!(
            session_id = ctx.session_id,
            subscriber = %id,
            client = %ctx.client_name(),
            stream = %ctx.stream,
            subscribers = pool.subscriber_count(),
            "Client connected"
        );

        let failure = loop {
            let chunk = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    state.terminate(Termination::Shutdown);
                    break None;
                }
                chunk = subscriber.recv() => match chunk {
                    Some(chunk) => chunk,
                    None => {
                        state.terminate(Termination::SessionClosed);
                        break None;
                    }
                },
            };

            let len = chunk.len();
            let delivered = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    state.terminate(Termination::Shutdown);
                    break None;
                }
                delivered = deliver(sink, chunk.freeze()) => delivered,
            };

            if let Err(e) = delivered {
                state.terminate(Termination::WriteFailed);
                break Some(e);
            }

            state.record_chunk(len);
        };

        pool.unregister(id);
        let stats = state.stats();

        tracing::info!(
            session_id = ctx.session_id,
            subscriber = %id,
            client = %ctx.client_name(),
            chunks = stats.chunks_sent,
            bytes = stats.bytes_sent,
            bitrate = stats.bitrate(),
            reason = %stats.termination.unwrap_or(Termination::WriteFailed),
            "Client connection closed"
        );

        match failure {
            Some(e) => Err(Error::DeliveryWrite(e)),
            None => {
                // Best effort; the client may already be gone
                let _ = sink.finish().await;
                Ok(stats)
            }
        }
    }
}

async fn deliver<S: StreamSink>(sink: &mut S, chunk: Bytes) -> io::Result<()> {
    sink.write_chunk(chunk).await?;
    sink.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::pool::PoolConfig;

    /// Records every chunk; optionally fails from the nth write on
    #[derive(Clone, Default)]
    struct RecordingSink {
        chunks: Arc<Mutex<Vec<Vec<u8>>>>,
        fail_after: Option<usize>,
        flushable: bool,
        started: Arc<Mutex<bool>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                flushable: true,
                ..Default::default()
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Self::new()
            }
        }

        fn received(&self) -> Vec<Vec<u8>> {
            self.chunks.lock().unwrap().clone()
        }
    }

    impl StreamSink for RecordingSink {
        fn supports_flush(&self) -> bool {
            self.flushable
        }

        async fn start(&mut self, _head: &StreamHead) -> io::Result<()> {
            *self.started.lock().unwrap() = true;
            Ok(())
        }

        async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
            let mut chunks = self.chunks.lock().unwrap();
            if self.fail_after.is_some_and(|n| chunks.len() >= n) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"));
            }
            chunks.push(chunk.to_vec());
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        async fn finish(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn context(id: u64) -> ConnectionContext {
        ConnectionContext::new(id, Some("127.0.0.1:40000".parse().unwrap())).with_stream("test")
    }

    fn handler(pool: &Arc<ConnectionPool>, id: u64, shutdown: &CancellationToken) -> ConnectionHandler {
        ConnectionHandler::new(
            Arc::clone(pool),
            pool.subscribe(),
            context(id),
            StreamHead::new("audio/aac"),
            shutdown.clone(),
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_relays_chunks_until_shutdown() {
        let pool = Arc::new(ConnectionPool::new());
        let shutdown = CancellationToken::new();
        let sink = RecordingSink::new();

        let task = {
            let handler = handler(&pool, 1, &shutdown);
            let mut sink = sink.clone();
            tokio::spawn(async move { handler.serve(&mut sink).await })
        };

        wait_until(|| pool.subscriber_count() == 1).await;

        for i in 0..3u8 {
            pool.broadcast(&[i; 8]);
            wait_until(|| sink.received().len() == i as usize + 1).await;
        }

        shutdown.cancel();
        let stats = task.await.unwrap().unwrap();

        assert_eq!(stats.chunks_sent, 3);
        assert_eq!(stats.bytes_sent, 24);
        assert_eq!(stats.termination, Some(Termination::Shutdown));
        assert_eq!(sink.received()[2], vec![2u8; 8]);
        assert!(*sink.started.lock().unwrap());
        assert_eq!(pool.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_unsupported_aborts() {
        let pool = Arc::new(ConnectionPool::new());
        let shutdown = CancellationToken::new();
        let mut sink = RecordingSink {
            flushable: false,
            ..RecordingSink::new()
        };

        let result = handler(&pool, 1, &shutdown).serve(&mut sink).await;

        assert!(matches!(result, Err(Error::FlushUnsupported)));
        assert_eq!(pool.subscriber_count(), 0);
        assert!(!*sink.started.lock().unwrap());

        // The pool keeps working for everyone else
        let mut other = pool.subscribe();
        pool.broadcast(b"still alive");
        assert!(other.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_write_failure_unregisters_only_that_subscriber() {
        let pool = Arc::new(ConnectionPool::with_config(
            PoolConfig::default().subscriber_capacity(8),
        ));
        let shutdown = CancellationToken::new();
        let sink_a = RecordingSink::failing_after(0);
        let sink_b = RecordingSink::new();

        let task_a = {
            let handler = handler(&pool, 1, &shutdown);
            let mut sink = sink_a.clone();
            tokio::spawn(async move { handler.serve(&mut sink).await })
        };
        let task_b = {
            let handler = handler(&pool, 2, &shutdown);
            let mut sink = sink_b.clone();
            tokio::spawn(async move { handler.serve(&mut sink).await })
        };

        wait_until(|| pool.subscriber_count() == 2).await;

        // A's next delivery fails
        pool.broadcast(b"chunk-0");
        let result_a = task_a.await.unwrap();
        assert!(matches!(result_a, Err(Error::DeliveryWrite(_))));
        assert_eq!(pool.subscriber_count(), 1);

        for i in 1..=4 {
            let outcome = pool.broadcast(format!("chunk-{}", i).as_bytes());
            assert_eq!(outcome.delivered + outcome.dropped, 1);
        }

        wait_until(|| sink_b.received().len() == 5).await;
        shutdown.cancel();

        let stats_b = task_b.await.unwrap().unwrap();
        assert_eq!(stats_b.chunks_sent, 5);
        assert!(sink_a.received().is_empty());

        let expected: Vec<Vec<u8>> = (0..=4).map(|i| format!("chunk-{}", i).into_bytes()).collect();
        assert_eq!(sink_b.received(), expected);
    }

    #[tokio::test]
    async fn test_session_close_ends_stream() {
        let pool = Arc::new(ConnectionPool::new());
        let shutdown = CancellationToken::new();
        let mut sink = RecordingSink::new();

        let handler = handler(&pool, 1, &shutdown);
        let serve = handler.serve(&mut sink);
        tokio::pin!(serve);

        // Let the handler register, then evict everyone
        tokio::select! {
            _ = &mut serve => panic!("handler finished early"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
        assert_eq!(pool.clear(), 1);

        let stats = serve.await.unwrap();
        assert_eq!(stats.termination, Some(Termination::SessionClosed));
        assert_eq!(stats.chunks_sent, 0);
    }

    /// Accepts the head, then never completes a write
    struct StalledSink;

    impl StreamSink for StalledSink {
        async fn start(&mut self, _head: &StreamHead) -> io::Result<()> {
            Ok(())
        }

        async fn write_chunk(&mut self, _chunk: Bytes) -> io::Result<()> {
            std::future::pending().await
        }

        async fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        async fn finish(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stalled_write() {
        let pool = Arc::new(ConnectionPool::new());
        let shutdown = CancellationToken::new();

        let task = {
            let handler = handler(&pool, 1, &shutdown);
            tokio::spawn(async move { handler.serve(&mut StalledSink).await })
        };

        pool.broadcast(b"stuck");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        shutdown.cancel();
        let stats = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(stats.termination, Some(Termination::Shutdown));
        assert_eq!(stats.chunks_sent, 0);
        assert_eq!(pool.subscriber_count(), 0);
    }
}
