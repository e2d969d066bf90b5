//! Statistics snapshots

use std::time::Duration;

use crate::pool::SubscriberId;

/// Pool-level counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Chunks offered to the pool
    pub chunks_broadcast: u64,
    /// Chunks accepted by a subscriber channel
    pub deliveries: u64,
    /// Chunks dropped because a subscriber was not ready
    pub chunks_dropped: u64,
}

impl PoolStats {
    /// Fraction of offered deliveries that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let attempts = self.deliveries + self.chunks_dropped;
        if attempts > 0 {
            self.chunks_dropped as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

/// Counters reported by a streaming loop when it stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Timer ticks handled
    pub ticks: u64,
    /// Completed passes over the content
    pub passes_completed: u64,
    /// Bytes emitted across all chunks
    pub bytes_emitted: u64,
}

/// Why a subscriber stopped receiving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Writing to the client failed
    WriteFailed,
    /// The output sink could not flush
    FlushUnsupported,
    /// Server shutdown
    Shutdown,
    /// The stream session was closed and its pool emptied
    SessionClosed,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Termination::WriteFailed => "write failed",
            Termination::FlushUnsupported => "flush unsupported",
            Termination::Shutdown => "shutdown",
            Termination::SessionClosed => "session closed",
        };
        f.write_str(s)
    }
}

/// Per-subscriber delivery statistics
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// Subscriber these stats belong to
    pub subscriber: SubscriberId,
    /// Chunks written and flushed to the client
    pub chunks_sent: u64,
    /// Payload bytes written to the client
    pub bytes_sent: u64,
    /// Time between registration and termination
    pub duration: Duration,
    /// How the subscriber ended, if it has
    pub termination: Option<Termination>,
}

impl SubscriberStats {
    /// Create empty stats for a subscriber
    pub fn new(subscriber: SubscriberId) -> Self {
        Self {
            subscriber,
            chunks_sent: 0,
            bytes_sent: 0,
            duration: Duration::ZERO,
            termination: None,
        }
    }

    /// Average delivery rate in bits per second
    pub fn bitrate(&self) -> u64 {
        let millis = self.duration.as_millis() as u64;
        if millis > 0 {
            (self.bytes_sent * 8 * 1000) / millis
        } else {
            0
        }
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Stream connections accepted
    pub total_connections: u64,
    /// Stream connections currently being served
    pub active_connections: u64,
    /// Stream requests refused because of the connection limit
    pub rejected_connections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_drop_ratio() {
        let stats = PoolStats {
            subscribers: 2,
            chunks_broadcast: 10,
            deliveries: 15,
            chunks_dropped: 5,
        };

        assert!((stats.drop_ratio() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_stats_drop_ratio_empty() {
        assert_eq!(PoolStats::default().drop_ratio(), 0.0);
    }

    #[test]
    fn test_subscriber_stats_new() {
        let stats = SubscriberStats::new(SubscriberId::new(3));

        assert_eq!(stats.subscriber, SubscriberId::new(3));
        assert_eq!(stats.chunks_sent, 0);
        assert_eq!(stats.bytes_sent, 0);
        assert!(stats.termination.is_none());
    }

    #[test]
    fn test_subscriber_bitrate() {
        let mut stats = SubscriberStats::new(SubscriberId::new(1));
        stats.bytes_sent = 16_384; // 4 chunks of 4096
        stats.duration = Duration::from_secs(1);

        // 16,384 bytes * 8 bits / 1 second
        assert_eq!(stats.bitrate(), 131_072);
    }

    #[test]
    fn test_subscriber_bitrate_zero_duration() {
        let mut stats = SubscriberStats::new(SubscriberId::new(1));
        stats.bytes_sent = 4096;

        assert_eq!(stats.bitrate(), 0);
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::WriteFailed.to_string(), "write failed");
        assert_eq!(Termination::Shutdown.to_string(), "shutdown");
    }
}
