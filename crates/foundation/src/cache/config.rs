//! Cache configuration
//!
//! Read once at construction; the host application owns loading these from
//! its config file or environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Cache system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Tiered lookup settings
    pub tiered: TieredCacheConfig,

    /// Backend chain settings
    pub backend: BackendChainConfig,
}

/// Tiered cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieredCacheConfig {
    /// Enable the semantic (level 2) lookup path
    #[serde(default = "default_enable_semantic")]
    pub enable_semantic: bool,

    /// Enable the template (level 3) lookup path
    #[serde(default = "default_enable_template")]
    pub enable_template: bool,

    /// TTL for exact-match (level 1) entries, minutes
    #[serde(default = "default_level1_ttl_minutes")]
    pub level1_ttl_minutes: u64,

    /// TTL for semantic-match (level 2) entries, minutes
    #[serde(default = "default_level2_ttl_minutes")]
    pub level2_ttl_minutes: u64,

    /// TTL for template-match (level 3) entries, minutes
    #[serde(default = "default_level3_ttl_minutes")]
    pub level3_ttl_minutes: u64,
}

/// Which backend a chain slot refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Redis,
    Sqlite,
    Memory,
}

/// Backend chain configuration
///
/// The chain is an explicit ordered list tried once at startup; selection
/// never depends on probing for optionally-installed software.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendChainConfig {
    /// Backends to try, in order. The in-process map never fails to open,
    /// so ending the list with `Memory` guarantees a working cache.
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendKind>,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// SQLite database path; `None` uses the per-user cache directory
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,

    /// Entry-count bound for the in-process map
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Bound on networked backend calls, milliseconds
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

// Default value functions
fn default_enable_semantic() -> bool {
    true
}
fn default_enable_template() -> bool {
    true
}
fn default_level1_ttl_minutes() -> u64 {
    1440
} // 24 hours
fn default_level2_ttl_minutes() -> u64 {
    720
} // 12 hours
fn default_level3_ttl_minutes() -> u64 {
    360
} // 6 hours
fn default_backends() -> Vec<BackendKind> {
    vec![BackendKind::Redis, BackendKind::Sqlite, BackendKind::Memory]
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_memory_capacity() -> usize {
    1024
}
fn default_op_timeout_ms() -> u64 {
    2000
}

impl Default for TieredCacheConfig {
    fn default() -> Self {
        Self {
            enable_semantic: default_enable_semantic(),
            enable_template: default_enable_template(),
            level1_ttl_minutes: default_level1_ttl_minutes(),
            level2_ttl_minutes: default_level2_ttl_minutes(),
            level3_ttl_minutes: default_level3_ttl_minutes(),
        }
    }
}

impl Default for BackendChainConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            redis_url: default_redis_url(),
            sqlite_path: None,
            memory_capacity: default_memory_capacity(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl TieredCacheConfig {
    /// Level 1 TTL as a Duration
    pub fn level1_ttl(&self) -> Duration {
        Duration::from_secs(self.level1_ttl_minutes * 60)
    }

    /// Level 2 TTL as a Duration
    pub fn level2_ttl(&self) -> Duration {
        Duration::from_secs(self.level2_ttl_minutes * 60)
    }

    /// Level 3 TTL as a Duration
    pub fn level3_ttl(&self) -> Duration {
        Duration::from_secs(self.level3_ttl_minutes * 60)
    }
}

impl BackendChainConfig {
    /// Operation timeout as a Duration
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl CacheConfig {
    /// Minimal config for resource-constrained environments: no external
    /// services, small in-process map, short TTLs.
    pub fn minimal() -> Self {
        Self {
            tiered: TieredCacheConfig {
                enable_semantic: false,
                enable_template: false,
                level1_ttl_minutes: 60,
                level2_ttl_minutes: 60,
                level3_ttl_minutes: 60,
            },
            backend: BackendChainConfig {
                backends: vec![BackendKind::Memory],
                memory_capacity: 256,
                ..Default::default()
            },
        }
    }

    /// Aggressive caching config: long TTLs, large in-process bound.
    pub fn performance() -> Self {
        Self {
            tiered: TieredCacheConfig {
                enable_semantic: true,
                enable_template: true,
                level1_ttl_minutes: 2880, // 48 hours
                level2_ttl_minutes: 1440,
                level3_ttl_minutes: 720,
            },
            backend: BackendChainConfig {
                memory_capacity: 4096,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.tiered.enable_semantic);
        assert_eq!(config.tiered.level1_ttl(), Duration::from_secs(86400));
        assert_eq!(
            config.backend.backends,
            vec![BackendKind::Redis, BackendKind::Sqlite, BackendKind::Memory]
        );
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: TieredCacheConfig =
            serde_json::from_str(r#"{"level1_ttl_minutes": 5}"#).unwrap();
        assert_eq!(config.level1_ttl_minutes, 5);
        assert!(config.enable_semantic);
        assert_eq!(config.level2_ttl_minutes, 720);
    }

    #[test]
    fn test_minimal_preset() {
        let config = CacheConfig::minimal();
        assert!(!config.tiered.enable_semantic);
        assert_eq!(config.backend.backends, vec![BackendKind::Memory]);
    }

    #[test]
    fn test_backend_kind_serialization() {
        let kinds: Vec<BackendKind> =
            serde_json::from_str(r#"["redis", "sqlite", "memory"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![BackendKind::Redis, BackendKind::Sqlite, BackendKind::Memory]
        );
    }
}
