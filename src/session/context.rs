//! Connection context
//!
//! Information about one client connection, carried into log records.

use std::net::SocketAddr;

/// Per-connection information passed to the connection handler
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Unique connection ID
    pub session_id: u64,

    /// Remote peer address, when the transport knows it
    pub peer_addr: Option<SocketAddr>,

    /// Host header, if the client sent one
    pub host: Option<String>,

    /// Label of the stream being served
    pub stream: String,
}

impl ConnectionContext {
    /// Create a new context
    pub fn new(session_id: u64, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            session_id,
            peer_addr,
            host: None,
            stream: String::new(),
        }
    }

    /// Set the Host header value
    pub fn with_host(mut self, host: Option<String>) -> Self {
        self.host = host;
        self
    }

    /// Set the stream label
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    /// Name the client by its Host header, falling back to the peer address
    pub fn client_name(&self) -> String {
        match (&self.host, self.peer_addr) {
            (Some(host), _) => host.clone(),
            (None, Some(peer)) => peer.to_string(),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Option<SocketAddr> {
        Some("127.0.0.1:50000".parse().unwrap())
    }

    #[test]
    fn test_client_name_prefers_host() {
        let ctx = ConnectionContext::new(1, addr()).with_host(Some("radio.local".into()));
        assert_eq!(ctx.client_name(), "radio.local");
    }

    #[test]
    fn test_client_name_falls_back_to_peer() {
        let ctx = ConnectionContext::new(1, addr()).with_stream("0001/intro");
        assert_eq!(ctx.client_name(), "127.0.0.1:50000");
        assert_eq!(ctx.stream, "0001/intro");
    }

    #[test]
    fn test_client_name_without_peer() {
        let ctx = ConnectionContext::new(1, None);
        assert_eq!(ctx.client_name(), "unknown");
    }
}
