//! Registry error types
//!
//! Error types for session registry operations.

use super::key::ContentKey;

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// Request path does not name a valid record/track pair
    InvalidKey(String),
    /// Registry has been shut down and accepts no new sessions
    ShuttingDown(ContentKey),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidKey(path) => write!(f, "Invalid content key: {}", path),
            RegistryError::ShuttingDown(key) => {
                write!(f, "Registry shutting down, cannot open: {}", key)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
