//! Cache configuration.
//!
//! Controls the revalidation horizon of the post index via `folio.toml`.

use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_REVALIDATE_SECS: u64 = 10;

/// Cache configuration from `folio.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a published index is served before it is rebuilt.
    pub revalidate_seconds: u64,
    /// Seconds a preview index is served; falls back to `revalidate_seconds`.
    pub preview_revalidate_seconds: Option<u64>,
    /// Build the published index before accepting requests.
    pub warm_on_startup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            revalidate_seconds: DEFAULT_REVALIDATE_SECS,
            preview_revalidate_seconds: None,
            warm_on_startup: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            revalidate_seconds: settings.revalidate.as_secs(),
            preview_revalidate_seconds: Some(settings.preview_revalidate.as_secs()),
            warm_on_startup: settings.warm_on_startup,
        }
    }
}

impl CacheConfig {
    /// Time-to-live for the index of the given mode, clamped to at least one second.
    pub fn ttl(&self, preview: bool) -> Duration {
        let seconds = if preview {
            self.preview_revalidate_seconds
                .unwrap_or(self.revalidate_seconds)
        } else {
            self.revalidate_seconds
        };
        Duration::from_secs(seconds.max(1))
    }
}
