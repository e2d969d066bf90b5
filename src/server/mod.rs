//! HTTP stream server
//!
//! Routes are served with axum:
//!
//! | Path | Response |
//! |------|----------|
//! | `/healthz` | `200 ok` |
//! | any other path (single-file mode) | endless audio stream |
//! | `/:record/:track` (library mode) | endless audio stream |
//!
//! Stream responses carry no Content-Length and stay open until the client
//! disconnects or the server shuts down. Each one is driven by a
//! [`ConnectionHandler`] writing into a [`BodySink`].

pub mod backend;
pub mod config;
pub mod handler;
pub mod listener;
pub mod routes;
pub mod sink;

pub use backend::ContentSource;
pub use config::ServerConfig;
pub use handler::{ConnectionHandler, StreamHead, StreamSink};
pub use listener::StreamServer;
pub use sink::{BodySink, PendingResponse};
