//! Crate-level error type
//!
//! Failures are either fatal to one stream session (content loading) or local
//! to a single request/subscriber. Nothing here is ever retried.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for loopcast operations
#[derive(Debug)]
pub enum Error {
    /// Socket level failure (bind, accept)
    Io(io::Error),
    /// Audio content could not be read
    ContentLoad { path: PathBuf, source: io::Error },
    /// Audio content is empty and cannot be looped
    EmptyContent { origin: String },
    /// The output sink cannot flush incrementally
    FlushUnsupported,
    /// Writing to a client failed (disconnect, network error)
    DeliveryWrite(io::Error),
    /// The request could not be parsed or is not acceptable
    BadRequest(String),
    /// Session registry failure
    Registry(RegistryError),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::ContentLoad { path, source } => {
                write!(f, "Failed to load content {}: {}", path.display(), source)
            }
            Error::EmptyContent { origin } => write!(f, "Content is empty: {}", origin),
            Error::FlushUnsupported => write!(f, "Output sink does not support flushing"),
            Error::DeliveryWrite(e) => write!(f, "Delivery write failed: {}", e),
            Error::BadRequest(reason) => write!(f, "Bad request: {}", reason),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Config(reason) => write!(f, "Invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) | Error::DeliveryWrite(e) => Some(e),
            Error::ContentLoad { source, .. } => Some(source),
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display_content_load() {
        let err = Error::ContentLoad {
            path: PathBuf::from("data/0001.aac"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };

        let msg = err.to_string();
        assert!(msg.contains("data/0001.aac"));
        assert!(msg.contains("missing"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_io_error() {
        let err: Error = io::Error::new(io::ErrorKind::AddrInUse, "busy").into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_flush_unsupported_has_no_source() {
        assert!(Error::FlushUnsupported.source().is_none());
    }
}
