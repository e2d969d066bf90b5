//! Session registry configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default file extension appended to track names
pub const DEFAULT_EXTENSION: &str = "aac";

/// Session registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory holding `<record>/<track>.<extension>` files
    pub data_dir: PathBuf,

    /// Extension appended to the track name
    pub extension: String,

    /// How long a session may have no subscribers before it is stopped
    pub idle_timeout: Duration,

    /// How often idle sessions are looked for
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            extension: DEFAULT_EXTENSION.to_string(),
            idle_timeout: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Create a config for the given data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the file extension
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.extension, "aac");
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.cleanup_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::with_data_dir("/srv/audio")
            .extension("mp3")
            .idle_timeout(Duration::from_secs(5))
            .cleanup_interval(Duration::from_secs(1));

        assert_eq!(config.data_dir, PathBuf::from("/srv/audio"));
        assert_eq!(config.extension, "mp3");
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }
}
