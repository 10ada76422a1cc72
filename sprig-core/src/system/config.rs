//! System Configuration

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables for a [`System`](super::System).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Upper bound on controller passes per refresh. A refresh keeps
    /// re-running the controller while the root component is dirty; a
    /// controller that dirties itself on every pass would otherwise spin.
    pub max_refresh_passes: u32,

    /// Whether refresh passes reclaim unvisited data nodes.
    pub gc_enabled: bool,

    /// Whether refresh passes discard cached data in skipped blocks.
    pub cache_clearing_enabled: bool,

    /// Refreshes between sweeps of the component registry. Zero is treated
    /// as one.
    pub component_registry_prune_interval: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_refresh_passes: 64,
            gc_enabled: true,
            cache_clearing_enabled: true,
            component_registry_prune_interval: 16,
        }
    }
}

impl SystemConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|error| Error::Config(Arc::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = SystemConfig::from_json(r#"{ "max_refresh_passes": 3 }"#).unwrap();
        assert_eq!(config.max_refresh_passes, 3);
        assert!(config.gc_enabled);
        assert!(config.cache_clearing_enabled);
        assert_eq!(config.component_registry_prune_interval, 16);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let error = SystemConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let config = SystemConfig {
            max_refresh_passes: 8,
            gc_enabled: false,
            cache_clearing_enabled: true,
            component_registry_prune_interval: 1,
        };
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(SystemConfig::from_json(&text).unwrap(), config);
    }
}
