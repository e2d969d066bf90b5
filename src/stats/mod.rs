//! Statistics for pools, streaming loops, subscribers and the server

pub mod metrics;

pub use metrics::{LoopStats, PoolStats, ServerStats, SubscriberStats, Termination};
