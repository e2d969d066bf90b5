//! Content keys
//!
//! A stream session is identified by a record and a track name, taken from a
//! request path of the form `/{record}/{track}`.

use std::path::PathBuf;

use super::error::RegistryError;

/// Unique identifier for a piece of content (record + track)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    /// Record (directory) name, e.g. "0001"
    pub record: String,
    /// Track (file stem) name, e.g. "intro"
    pub track: String,
}

impl ContentKey {
    /// Create a key, validating both segments
    pub fn new(record: impl Into<String>, track: impl Into<String>) -> Result<Self, RegistryError> {
        let record = record.into();
        let track = track.into();

        if !is_valid_segment(&record) || !is_valid_segment(&track) {
            return Err(RegistryError::InvalidKey(format!("{}/{}", record, track)));
        }

        Ok(Self { record, track })
    }

    /// File path relative to the data directory
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let file = if extension.is_empty() {
            self.track.clone()
        } else {
            format!("{}.{}", self.track, extension)
        };
        PathBuf::from(&self.record).join(file)
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.record, self.track)
    }
}

/// Segments become path components, so they must not escape the data directory
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_display() {
        let key = ContentKey::new("0001", "intro").unwrap();

        assert_eq!(key.record, "0001");
        assert_eq!(key.track, "intro");
        assert_eq!(key.to_string(), "0001/intro");
    }

    #[test]
    fn test_relative_path() {
        let key = ContentKey::new("0001", "intro").unwrap();

        assert_eq!(key.relative_path("aac"), PathBuf::from("0001").join("intro.aac"));
        assert_eq!(key.relative_path(""), PathBuf::from("0001").join("intro"));
    }

    #[test]
    fn test_rejects_empty_segments() {
        assert!(ContentKey::new("", "intro").is_err());
        assert!(ContentKey::new("0001", "").is_err());
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(ContentKey::new("..", "secret").is_err());
        assert!(ContentKey::new("0001", "..").is_err());
        assert!(ContentKey::new("0001", "a/b").is_err());
        assert!(ContentKey::new("a\\b", "c").is_err());
        assert!(ContentKey::new("a b", "c").is_err());
    }

    #[test]
    fn test_allows_dots_inside_names() {
        let key = ContentKey::new("album.v2", "track_01-final").unwrap();
        assert_eq!(key.track, "track_01-final");
    }
}
