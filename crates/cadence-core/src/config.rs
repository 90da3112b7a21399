//! Store configuration.

use serde::{Deserialize, Serialize};

/// Tunables of the in-memory store.
///
/// `serde` derive so it can be embedded in a larger configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Page size used when `TaskSearchParams::page_size` is 0.
    pub default_page_size: usize,

    /// Largest accepted `page_size`. Bigger requests are rejected, not clamped.
    pub max_page_size: usize,

    /// Cascading deletes poll the cancellation token every this many records.
    pub cancel_check_interval: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 500,
            cancel_check_interval: 1024,
        }
    }
}

impl StoreConfig {
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.default_page_size, 100);
        assert_eq!(config.max_page_size, 500);
        assert_eq!(config.cancel_check_interval, 1024);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"max_page_size": 50}"#).unwrap();
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 100);
    }

    #[test]
    fn cancel_check_interval_is_at_least_one() {
        let config = StoreConfig::default().with_cancel_check_interval(0);
        assert_eq!(config.cancel_check_interval, 1);
    }
}
