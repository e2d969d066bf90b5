//! Session registry for multi-track serving
//!
//! The registry maps a [`ContentKey`] to a running [`StreamSession`]. Each
//! session owns exactly one streaming loop and one connection pool, however
//! many clients are listening.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SessionRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ sessions: HashMap<Key,       │
//!                 │   StreamSession {            │
//!                 │     pool: Arc<ConnectionPool>│
//!                 │     loop: JoinHandle,        │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//!   GET /0001/intro        GET /0001/intro        GET /0002/outro
//!   open() ─► load+start   open() ─► join pool    open() ─► load+start
//! ```
//!
//! Sessions that keep zero subscribers for longer than the idle timeout are
//! stopped by the cleanup task.

pub mod config;
pub mod error;
pub mod key;
pub mod session;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use key::ContentKey;
pub use session::StreamSession;
pub use store::SessionRegistry;
