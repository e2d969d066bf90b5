//! Audio content loading
//!
//! Content is read into memory once per stream session and never mutated
//! afterwards. `Bytes` makes it cheap to hand the same buffer to the
//! streaming loop without copying.

use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Immutable audio payload for one stream session
#[derive(Debug, Clone)]
pub struct AudioContent {
    data: Bytes,
    origin: String,
}

impl AudioContent {
    /// Wrap an in-memory buffer
    ///
    /// Returns [`Error::EmptyContent`] if the buffer is empty, since an empty
    /// payload cannot be looped.
    pub fn from_bytes(origin: impl Into<String>, data: impl Into<Bytes>) -> Result<Self> {
        let origin = origin.into();
        let data = data.into();

        if data.is_empty() {
            return Err(Error::EmptyContent { origin });
        }

        Ok(Self { data, origin })
    }

    /// Read a whole file into memory
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let data = tokio::fs::read(path).await.map_err(|source| Error::ContentLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let content = Self::from_bytes(path.display().to_string(), data)?;

        tracing::info!(
            origin = %content.origin,
            bytes = content.len(),
            "Audio content loaded"
        );

        Ok(content)
    }

    /// Where the content came from (file path or caller-supplied label)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Content length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; empty content is rejected at construction
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
