//! Per-connection session state
//!
//! Each streaming client gets a [`ConnectionContext`] describing the
//! connection and a [`SubscriberState`] tracking its delivery lifecycle.

pub mod context;
pub mod state;

pub use context::ConnectionContext;
pub use state::{SubscriberPhase, SubscriberState};
