//! Content backends
//!
//! A server either loops a single piece of content for every stream request,
//! or serves a library of `<record>/<track>` files through a session registry.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::ServerConfig;
use crate::content::AudioContent;
use crate::error::{Error, Result};
use crate::pool::{ConnectionPool, Subscriber};
use crate::registry::{ContentKey, RegistryConfig, SessionRegistry, StreamSession};

/// Where stream content comes from
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Loop one already-loaded file on every stream path
    Single(AudioContent),
    /// Serve `<data_dir>/<record>/<track>.<extension>` on `/{record}/{track}`
    Library(RegistryConfig),
}

/// Running backend for one server instance
pub(crate) enum Backend {
    Single {
        pool: Arc<ConnectionPool>,
        label: String,
        session: Mutex<Option<StreamSession>>,
    },
    Library {
        registry: Arc<SessionRegistry>,
        cleanup: Mutex<Option<JoinHandle<()>>>,
    },
}

impl Backend {
    /// Start streaming; loops stop when `shutdown` is cancelled
    pub(crate) fn start(source: ContentSource, config: &ServerConfig, shutdown: &CancellationToken) -> Self {
        match source {
            ContentSource::Single(content) => {
                let session = StreamSession::start(
                    content,
                    config.pool.clone(),
                    config.stream.clone(),
                    shutdown.child_token(),
                );

                Backend::Single {
                    pool: Arc::clone(session.pool()),
                    label: session.label().to_string(),
                    session: Mutex::new(Some(session)),
                }
            }
            ContentSource::Library(registry_config) => {
                tracing::info!(
                    data_dir = %registry_config.data_dir.display(),
                    extension = %registry_config.extension,
                    "Serving content library"
                );

                let registry = Arc::new(SessionRegistry::with_shutdown(
                    registry_config,
                    config.pool.clone(),
                    config.stream.clone(),
                    shutdown.child_token(),
                ));
                let cleanup = registry.spawn_cleanup_task();

                Backend::Library {
                    registry,
                    cleanup: Mutex::new(Some(cleanup)),
                }
            }
        }
    }

    /// Subscribe a new client, returning its pool and a label for logging
    ///
    /// Library mode needs a key; single-file mode ignores it.
    pub(crate) async fn open(&self, key: Option<&ContentKey>) -> Result<(Arc<ConnectionPool>, Subscriber, String)> {
        match (self, key) {
            (Backend::Single { pool, label, .. }, _) => Ok((Arc::clone(pool), pool.subscribe(), label.clone())),
            (Backend::Library { registry, .. }, Some(key)) => {
                let (pool, subscriber) = registry.open(key).await?;
                Ok((pool, subscriber, key.to_string()))
            }
            (Backend::Library { .. }, None) => {
                Err(Error::BadRequest("stream path must be /{record}/{track}".into()))
            }
        }
    }

    /// Whether stream paths name a `<record>/<track>` in a library
    pub(crate) fn is_library(&self) -> bool {
        matches!(self, Backend::Library { .. })
    }

    /// Stop every loop and wait for them
    pub(crate) async fn stop(&self) {
        match self {
            Backend::Single { session, .. } => {
                let session = session
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(session) = session {
                    session.stop().await;
                }
            }
            Backend::Library { registry, cleanup } => {
                registry.shutdown().await;

                let cleanup = cleanup
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(cleanup) = cleanup {
                    let _ = cleanup.await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryError;

    #[tokio::test]
    async fn test_single_serves_every_request_from_one_pool() {
        let content = AudioContent::from_bytes("single", vec![0u8; 100]).unwrap();
        let shutdown = CancellationToken::new();
        let backend = Backend::start(ContentSource::Single(content), &ServerConfig::default(), &shutdown);
        assert!(!backend.is_library());

        let (first, _a, label) = backend.open(None).await.unwrap();
        let key = ContentKey::new("any", "thing").unwrap();
        let (second, _b, _) = backend.open(Some(&key)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.subscriber_count(), 2);
        assert_eq!(label, "single");

        backend.stop().await;
        // Stopping twice is harmless
        backend.stop().await;
    }

    #[tokio::test]
    async fn test_library_needs_existing_content() {
        let shutdown = CancellationToken::new();
        let source = ContentSource::Library(RegistryConfig::with_data_dir("/nonexistent"));
        let backend = Backend::start(source, &ServerConfig::default(), &shutdown);
        assert!(backend.is_library());

        let result = backend.open(None).await;
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let key = ContentKey::new("0001", "missing").unwrap();
        let result = backend.open(Some(&key)).await;
        assert!(matches!(result, Err(Error::ContentLoad { .. })));

        backend.stop().await;

        let result = backend.open(Some(&key)).await;
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::ShuttingDown(_)))
        ));
    }
}
