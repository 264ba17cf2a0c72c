//! Trace side-cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceCacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    /// Namespace prepended to every cache key
    pub key_prefix: String,
}

impl Default for TraceCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 900,
            key_prefix: "lumi".to_string(),
        }
    }
}

impl TraceCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
