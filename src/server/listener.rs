//! Stream server listener
//!
//! Binds the TCP listener, serves the router with axum and coordinates
//! shutdown of loops and stream handlers.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::backend::{Backend, ContentSource};
use super::config::ServerConfig;
use super::routes::{self, AppState, StreamCounters};
use crate::error::Result;
use crate::stats::ServerStats;

/// HTTP audio stream server
pub struct StreamServer {
    config: Arc<ServerConfig>,
    source: ContentSource,
    stream_limit: Option<Arc<Semaphore>>,
    counters: Arc<StreamCounters>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl StreamServer {
    /// Create a new server with the given configuration and content source
    pub fn new(config: ServerConfig, source: ContentSource) -> Result<Self> {
        config.validate()?;

        let stream_limit = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            source,
            stream_limit,
            counters: Arc::new(StreamCounters::default()),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the server, its loops and all handlers when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Stream connection statistics
    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot()
    }

    /// Run the server
    ///
    /// This method blocks until the shutdown token is cancelled.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let backend = Arc::new(Backend::start(self.source.clone(), &self.config, &self.shutdown));

        let app = routes::router(AppState {
            config: Arc::clone(&self.config),
            backend: Arc::clone(&backend),
            counters: Arc::clone(&self.counters),
            stream_limit: self.stream_limit.clone(),
            tracker: self.tracker.clone(),
            shutdown: self.shutdown.clone(),
        });

        tracing::info!(
            addr = %listener.local_addr()?,
            chunk_size = self.config.stream.chunk_size,
            tick_ms = self.config.stream.tick_period.as_millis() as u64,
            "Stream server listening"
        );

        // Cancelling the token ends every stream body, which lets hyper
        // finish the responses and close the connections
        let token = self.shutdown.clone();
        let signal = async move {
            tokio::select! {
                _ = shutdown => {
                    tracing::info!("Shutdown signal received");
                }
                _ = token.cancelled() => {
                    tracing::info!("Shutdown requested");
                }
            }
            token.cancel();
        };

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .into_future();

        let grace = async {
            self.shutdown.cancelled().await;
            tokio::time::sleep(self.config.shutdown_grace).await;
        };

        tokio::select! {
            result = server => result?,
            _ = grace => {
                tracing::warn!(
                    active = self.counters.snapshot().active_connections,
                    "Connections still open after shutdown grace period"
                );
            }
        }

        // Stop handlers and loops
        self.shutdown.cancel();
        backend.stop().await;

        self.tracker.close();
        if tokio::time::timeout(self.config.shutdown_grace, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!("Stream handlers still running after shutdown grace period");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AudioContent;
    use crate::error::Error;

    fn source() -> ContentSource {
        ContentSource::Single(AudioContent::from_bytes("listener-test", vec![1u8; 64]).unwrap())
    }

    #[test]
    fn test_new_validates_config() {
        let result = StreamServer::new(ServerConfig::default().chunk_size(0), source());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_token() {
        let server = StreamServer::new(ServerConfig::default(), source()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let token = server.shutdown_token();

        token.cancel();
        server.serve(listener, std::future::pending()).await.unwrap();

        assert_eq!(server.stats(), ServerStats::default());
    }

    #[tokio::test]
    async fn test_serve_stops_on_future() {
        let server = StreamServer::new(ServerConfig::default(), source()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        server
            .serve(listener, tokio::time::sleep(std::time::Duration::from_millis(10)))
            .await
            .unwrap();

        assert!(server.shutdown_token().is_cancelled());
    }
}
