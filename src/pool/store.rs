//! Connection pool implementation
//!
//! A single mutex guards the subscriber map. Register, unregister and
//! broadcast all serialize on it, but none of them ever awaits while holding
//! it: delivery is a `try_send` that either succeeds immediately or drops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::config::PoolConfig;
use super::subscriber::{Chunk, Registration, Subscriber, SubscriberId};
use crate::stats::PoolStats;

/// Result of offering one chunk to every subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers that accepted the chunk
    pub delivered: usize,
    /// Subscribers whose channel was full; they stay registered
    pub dropped: usize,
    /// Subscribers whose receiver was gone; they were removed
    pub pruned: usize,
}

/// Registry of subscribers for one stream session
pub struct ConnectionPool {
    /// Registered subscribers, keyed by id
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Chunk>>>,

    next_subscriber_id: AtomicU64,

    chunks_broadcast: AtomicU64,
    deliveries: AtomicU64,
    chunks_dropped: AtomicU64,

    config: PoolConfig,
}

impl ConnectionPool {
    /// Create a pool with default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with custom configuration
    ///
    /// A zero subscriber capacity is raised to 1.
    pub fn with_config(mut config: PoolConfig) -> Self {
        config.subscriber_capacity = config.subscriber_capacity.max(1);

        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
            chunks_broadcast: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            chunks_dropped: AtomicU64::new(0),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Chunk>>> {
        // The map stays consistent even if a holder panicked: every critical
        // section is a single insert, remove or retain.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new, not yet registered, subscriber channel
    pub fn channel(&self) -> (Registration, Subscriber) {
        let id = SubscriberId::new(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        Subscriber::channel(id, self.config.subscriber_capacity)
    }

    /// Create a subscriber channel and register it in one step
    pub fn subscribe(&self) -> Subscriber {
        let (registration, subscriber) = self.channel();
        self.register(registration);
        subscriber
    }

    /// Add a subscriber
    ///
    /// Registering an id that is already present replaces its channel.
    pub fn register(&self, registration: Registration) {
        let Registration { id, tx } = registration;

        let count = {
            let mut subscribers = self.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };

        tracing::debug!(subscriber = %id, subscribers = count, "Subscriber registered");
    }

    /// Remove a subscriber
    ///
    /// Returns `false` if it was not registered. Safe to call repeatedly.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let (removed, count) = {
            let mut subscribers = self.lock();
            let removed = subscribers.remove(&id).is_some();
            (removed, subscribers.len())
        };

        if removed {
            tracing::debug!(subscriber = %id, subscribers = count, "Subscriber unregistered");
        }

        removed
    }

    /// Remove every subscriber
    ///
    /// Dropping the senders ends each subscriber's `recv` loop. Returns the
    /// number of subscribers removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        drained.len()
    }

    /// Check whether a subscriber is registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Offer a copy of `chunk` to every registered subscriber
    ///
    /// Never waits on a subscriber. A full channel drops the chunk for that
    /// subscriber only; a closed channel is removed from the registry.
    pub fn broadcast(&self, chunk: &[u8]) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();

        {
            let mut subscribers = self.lock();

            subscribers.retain(|id, tx| match tx.try_send(BytesMut::from(chunk)) {
                Ok(()) => {
                    outcome.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    outcome.dropped += 1;
                    tracing::trace!(subscriber = %id, "Subscriber not ready, chunk dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    outcome.pruned += 1;
                    false
                }
            });
        }

        self.chunks_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        self.chunks_dropped
            .fetch_add(outcome.dropped as u64, Ordering::Relaxed);

        if outcome.pruned > 0 {
            tracing::debug!(pruned = outcome.pruned, "Removed closed subscribers");
        }

        outcome
    }

    /// Snapshot of pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            subscribers: self.subscriber_count(),
            chunks_broadcast: self.chunks_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}
