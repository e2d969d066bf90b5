//! Session registry implementation
//!
//! Maps content keys to running stream sessions. The first request for a key
//! loads the file and starts its loop; later requests join the same pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::key::ContentKey;
use super::session::StreamSession;
use crate::content::AudioContent;
use crate::error::Result;
use crate::pool::{ConnectionPool, PoolConfig, Subscriber};
use crate::streaming::StreamConfig;

struct SessionEntry {
    session: StreamSession,
    /// When the session was first seen without subscribers
    idle_since: Option<Instant>,
}

impl SessionEntry {
    /// Register a new subscriber and mark the session busy
    fn join(&mut self) -> (Arc<ConnectionPool>, Subscriber) {
        self.idle_since = None;
        let pool = Arc::clone(self.session.pool());
        let subscriber = pool.subscribe();
        (pool, subscriber)
    }
}

/// Registry of stream sessions, one per content key
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ContentKey, SessionEntry>>,
    /// Files being read for sessions that are about to start
    loading: Mutex<HashMap<ContentKey, Arc<OnceCell<AudioContent>>>>,
    config: RegistryConfig,
    pool_config: PoolConfig,
    stream_config: StreamConfig,
    /// Parent of every session's loop token
    shutdown: CancellationToken,
}

impl SessionRegistry {
    /// Create a registry
    pub fn new(config: RegistryConfig, pool_config: PoolConfig, stream_config: StreamConfig) -> Self {
        Self::with_shutdown(config, pool_config, stream_config, CancellationToken::new())
    }

    /// Create a registry whose sessions stop when `shutdown` is cancelled
    pub fn with_shutdown(
        config: RegistryConfig,
        pool_config: PoolConfig,
        stream_config: StreamConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
            config,
            pool_config,
            stream_config,
            shutdown,
        }
    }

    /// Subscribe to the session for `key`, starting it if none is running
    ///
    /// The subscriber is registered before the registry lock is released, so
    /// cleanup never reaps a session between lookup and subscription.
    /// Concurrent calls for the same key start exactly one loop. The file is
    /// read without holding the registry lock.
    pub async fn open(&self, key: &ContentKey) -> Result<(Arc<ConnectionPool>, Subscriber)> {
        if let Some(entry) = self.sessions.write().await.get_mut(key) {
            return Ok(entry.join());
        }

        if self.shutdown.is_cancelled() {
            return Err(RegistryError::ShuttingDown(key.clone()).into());
        }

        let cell = self.loading_cell(key);
        let path = self.config.data_dir.join(key.relative_path(&self.config.extension));
        let loaded = cell
            .get_or_try_init(|| AudioContent::load(&path))
            .await
            .map(AudioContent::clone);

        let mut sessions = self.sessions.write().await;
        self.forget_loading(key, &cell);
        let content = loaded?;

        // Another caller may have started it while we were loading
        if let Some(entry) = sessions.get_mut(key) {
            return Ok(entry.join());
        }

        if self.shutdown.is_cancelled() {
            return Err(RegistryError::ShuttingDown(key.clone()).into());
        }

        let session = StreamSession::start(
            content,
            self.pool_config.clone(),
            self.stream_config.clone(),
            self.shutdown.child_token(),
        );
        let mut entry = SessionEntry {
            session,
            idle_since: None,
        };
        let joined = entry.join();
        sessions.insert(key.clone(), entry);

        tracing::info!(
            stream = %key,
            sessions = sessions.len(),
            "Stream session started"
        );

        Ok(joined)
    }

    fn loading_cell(&self, key: &ContentKey) -> Arc<OnceCell<AudioContent>> {
        let mut loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(loading.entry(key.clone()).or_default())
    }

    fn forget_loading(&self, key: &ContentKey, cell: &Arc<OnceCell<AudioContent>>) {
        let mut loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if loading.get(key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
            loading.remove(key);
        }
    }

    /// Stop and remove the session for `key`
    ///
    /// Returns `false` if no session was running.
    pub async fn close(&self, key: &ContentKey) -> bool {
        let entry = self.sessions.write().await.remove(key);

        match entry {
            Some(entry) => {
                entry.session.stop().await;
                true
            }
            None => false,
        }
    }

    /// Check if a session is running for `key`
    pub async fn contains(&self, key: &ContentKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    /// Number of running sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Total subscribers across all sessions
    pub async fn subscriber_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .map(|entry| entry.session.subscriber_count())
            .sum()
    }

    /// Run cleanup once
    ///
    /// Stops sessions that have had no subscribers for at least
    /// `idle_timeout`. Returns the number of sessions stopped.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();

        let expired: Vec<(ContentKey, SessionEntry)> = {
            let mut sessions = self.sessions.write().await;

            let keys: Vec<ContentKey> = sessions
                .iter_mut()
                .filter_map(|(key, entry)| {
                    if entry.session.subscriber_count() > 0 {
                        entry.idle_since = None;
                        return None;
                    }

                    let since = *entry.idle_since.get_or_insert(now);
                    if now.duration_since(since) >= self.config.idle_timeout {
                        Some(key.clone())
                    } else {
                        None
                    }
                })
                .collect();

            keys.into_iter()
                .filter_map(|key| sessions.remove(&key).map(|entry| (key, entry)))
                .collect()
        };

        let removed = expired.len();

        for (key, entry) in expired {
            tracing::info!(stream = %key, "Idle stream session removed by cleanup");
            entry.session.stop().await;
        }

        removed
    }

    /// Spawn background cleanup task
    ///
    /// The task ends when the registry's shutdown token is cancelled.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = registry.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.cleanup().await;
                    }
                }
            }
        })
    }

    /// Stop every session and refuse new ones
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let drained: Vec<(ContentKey, SessionEntry)> =
            self.sessions.write().await.drain().collect();

        for (key, entry) in drained {
            tracing::debug!(stream = %key, "Stopping stream session");
            entry.session.stop().await;
        }
    }
}
