//! Connection pool for best-effort fan-out
//!
//! The pool is the registry of subscribers attached to one stream session.
//! Every chunk produced by the streaming loop is offered to each subscriber
//! through its own bounded channel.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ConnectionPool>
//!                 ┌─────────────────────────────┐
//!                 │ subscribers: Mutex<HashMap< │
//!                 │   SubscriberId,             │
//!                 │   mpsc::Sender<Chunk>,      │
//!                 │ >>                          │
//!                 └──────────────┬──────────────┘
//!                                │
//!       ┌────────────────────────┼────────────────────────┐
//!       │                        │                        │
//!       ▼                        ▼                        ▼
//! [StreamingLoop]          [Subscriber]             [Subscriber]
//! pool.broadcast()         rx.recv()                rx.recv()
//!       │                        │                        │
//!       └──► try_send(copy) ─────┴──► write + flush ──► TCP
//! ```
//!
//! # Backpressure
//!
//! Broadcasting never awaits. A subscriber whose channel is full simply
//! misses the chunk and stays registered. Each subscriber receives its own
//! `BytesMut` copy, so no two deliveries share storage.

pub mod config;
pub mod store;
pub mod subscriber;

pub use config::PoolConfig;
pub use store::{BroadcastOutcome, ConnectionPool};
pub use subscriber::{Chunk, Registration, Subscriber, SubscriberId};
