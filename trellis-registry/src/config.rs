//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Largest normalized edit distance a search hit may have (0.0 to 1.0).
    pub search_threshold: f64,
    /// Result limit used when a search does not give one.
    pub default_search_limit: usize,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_threshold: 0.4,
            default_search_limit: 10,
            event_capacity: 256,
        }
    }
}
