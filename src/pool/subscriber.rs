//! Subscriber identity and delivery channel

use bytes::BytesMut;
use tokio::sync::mpsc;

/// One window of audio content as delivered to a single subscriber
///
/// Every subscriber gets its own allocation, so a `Chunk` may be mutated
/// freely by its owner.
pub type Chunk = BytesMut;

/// Unique identifier for a subscriber within a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Create an identifier from a raw value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The pool's half of a subscriber: what gets stored in the registry
#[derive(Debug, Clone)]
pub struct Registration {
    pub(super) id: SubscriberId,
    pub(super) tx: mpsc::Sender<Chunk>,
}

impl Registration {
    /// Identifier of the subscriber this registration delivers to
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// The handler's half of a subscriber: the receiving end of its channel
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    rx: mpsc::Receiver<Chunk>,
}

impl Subscriber {
    /// Create a subscriber channel with the given capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn channel(id: SubscriberId, capacity: usize) -> (Registration, Subscriber) {
        let (tx, rx) = mpsc::channel(capacity);
        (Registration { id, tx }, Subscriber { id, rx })
    }

    /// Identifier of this subscriber
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next chunk
    ///
    /// Returns `None` once the pool has dropped its registration.
    pub async fn recv(&mut self) -> Option<Chunk> {
        self.rx.recv().await
    }

    /// Take a chunk if one is already queued
    pub fn try_recv(&mut self) -> Option<Chunk> {
        self.rx.try_recv().ok()
    }
}
