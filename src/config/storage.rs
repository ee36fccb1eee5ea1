//! Storage backend configuration.

use serde::Deserialize;

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type (`sqlite` or `memory`).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// SQLite-specific settings.
    pub sqlite: SqliteConfig,
}

impl StorageConfig {
    /// In-memory storage; nothing survives the process.
    pub fn memory() -> Self {
        Self {
            storage_type: "memory".to_string(),
            ..Self::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "sqlite".to_string(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// SQLite configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to database file.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "./data/cart-engine.db".to_string(),
        }
    }
}
