//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

use serde::Deserialize;

mod runtime;
mod storage;

pub use runtime::{EntityConfig, LoggingConfig, ReadSideConfig, TaggingConfig};
pub use storage::{SqliteConfig, StorageConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "cart-engine.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CART_ENGINE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CART_ENGINE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CART_ENGINE_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Entity runtime configuration.
    pub entity: EntityConfig,
    /// Shard tagging configuration.
    pub tagging: TaggingConfig,
    /// Read-side consumer configuration.
    pub read_side: ReadSideConfig,
    /// Log output configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `cart-engine.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.tagging.shards == 0 {
            return invalid("tagging.shards must be greater than zero");
        }
        if self.tagging.tag_prefix.is_empty() {
            return invalid("tagging.tag_prefix must not be empty");
        }
        if self.entity.snapshot_every == 0 {
            return invalid("entity.snapshot_every must be greater than zero");
        }
        if self.entity.keep_snapshots == 0 {
            return invalid("entity.keep_snapshots must be greater than zero");
        }
        if self.entity.ask_timeout_ms == 0 {
            return invalid("entity.ask_timeout_ms must be greater than zero");
        }
        if self.entity.mailbox_capacity == 0 {
            return invalid("entity.mailbox_capacity must be greater than zero");
        }
        if self.read_side.batch_size == 0 {
            return invalid("read_side.batch_size must be greater than zero");
        }
        if self.read_side.topic_capacity == 0 {
            return invalid("read_side.topic_capacity must be greater than zero");
        }
        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::memory(),
            ..Self::default()
        }
    }
}
