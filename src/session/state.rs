//! Subscriber state machine
//!
//! Tracks one subscriber from registration to termination. There is no way
//! back out of `Terminated`; a client that reconnects gets a new subscriber.

use std::time::Instant;

use crate::pool::SubscriberId;
use crate::stats::{SubscriberStats, Termination};

/// Subscriber lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberPhase {
    /// Registered with the pool, response not started
    Registered,
    /// Receiving chunks and writing them to the client
    Delivering,
    /// Finished; unregistered from the pool
    Terminated,
}

/// Complete subscriber state
#[derive(Debug)]
pub struct SubscriberState {
    /// Subscriber ID in the pool
    pub id: SubscriberId,

    /// Current phase
    pub phase: SubscriberPhase,

    /// Registration time
    pub registered_at: Instant,

    /// Chunks written and flushed
    pub chunks_sent: u64,

    /// Payload bytes written
    pub bytes_sent: u64,

    /// Set once the subscriber terminates
    pub termination: Option<Termination>,
}

impl SubscriberState {
    /// Create state for a freshly registered subscriber
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            phase: SubscriberPhase::Registered,
            registered_at: Instant::now(),
            chunks_sent: 0,
            bytes_sent: 0,
            termination: None,
        }
    }

    /// Response head sent, start relaying chunks
    pub fn start_delivering(&mut self) {
        if self.phase == SubscriberPhase::Registered {
            self.phase = SubscriberPhase::Delivering;
        }
    }

    /// Record a chunk that was written and flushed
    pub fn record_chunk(&mut self, len: usize) {
        if self.phase == SubscriberPhase::Delivering {
            self.chunks_sent += 1;
            self.bytes_sent += len as u64;
        }
    }

    /// Terminate; only the first reason is kept
    pub fn terminate(&mut self, reason: Termination) {
        if self.phase != SubscriberPhase::Terminated {
            self.phase = SubscriberPhase::Terminated;
            self.termination = Some(reason);
        }
    }

    /// Check if the subscriber is relaying chunks
    pub fn is_delivering(&self) -> bool {
        self.phase == SubscriberPhase::Delivering
    }

    /// Snapshot as statistics
    pub fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            subscriber: self.id,
            chunks_sent: self.chunks_sent,
            bytes_sent: self.bytes_sent,
            duration: self.registered_at.elapsed(),
            termination: self.termination,
        }
    }
}
