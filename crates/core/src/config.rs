//! Configuration management
//!
//! This module handles loading, saving, and migrating the s3ops configuration
//! file. The configuration file is stored in TOML format at
//! `<config dir>/s3ops/config.toml`, or below `$S3OPS_CONFIG_DIR` when set.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::MAX_BACKEND_BATCH;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "S3OPS_CONFIG_DIR";

const DEFAULT_OUTPUT: &str = "human";
const DEFAULT_COLOR: &str = "auto";
const DEFAULT_CONCURRENCY: usize = 4;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Bucket connection settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

/// Default settings for CLI and engine behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Report upload progress after every file
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Maximum keys per listing request
    #[serde(default = "default_batch")]
    pub page_size: usize,

    /// Maximum keys per delete-many request
    #[serde(default = "default_batch")]
    pub delete_batch_size: usize,

    /// Concurrent transfers per operation
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch() -> usize {
    MAX_BACKEND_BATCH
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
            page_size: default_batch(),
            delete_batch_size: default_batch(),
            concurrency: default_concurrency(),
        }
    }
}

impl Defaults {
    /// Engine limits derived from these settings
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::default()
            .page_size(self.page_size)
            .delete_batch_size(self.delete_batch_size)
            .concurrency(self.concurrency)
    }
}

/// Connection settings for the single bucket the engine operates on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3 endpoint URL
    pub endpoint: String,

    /// Bucket name
    pub bucket: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Region
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket lookup style: "auto", "path", or "dns"
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl StorageConfig {
    /// Create storage settings with default region and lookup style
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            bucket_lookup: default_bucket_lookup(),
        }
    }

    /// Check that the settings can be used to build a client
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::Config("endpoint cannot be empty".into()));
        }
        url::Url::parse(&self.endpoint)?;

        if self.bucket.is_empty() {
            return Err(Error::Config("bucket cannot be empty".into()));
        }

        if !matches!(self.bucket_lookup.as_str(), "auto" | "path" | "dns") {
            return Err(Error::Config(format!(
                "bucket_lookup must be 'auto', 'path', or 'dns', got '{}'",
                self.bucket_lookup
            )));
        }

        Ok(())
    }

    /// Whether requests should use path-style addressing
    pub fn force_path_style(&self) -> bool {
        self.bucket_lookup == "path" || self.bucket_lookup == "auto"
    }
}

/// Limits applied by the engine components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Keys requested per listing page
    pub page_size: usize,

    /// Keys per delete-many call
    pub delete_batch_size: usize,

    /// Transfers in flight at once
    pub concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_BACKEND_BATCH,
            delete_batch_size: MAX_BACKEND_BATCH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl EngineOptions {
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.clamp(1, MAX_BACKEND_BATCH);
        self
    }

    pub fn delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size.clamp(1, MAX_BACKEND_BATCH);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            storage: None,
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("s3ops"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade s3ops.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        tracing::debug!("saved configuration to {}", self.config_path.display());
        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::info!(
            "migrating configuration from schema {} to {}",
            config.schema_version,
            SCHEMA_VERSION
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.output, "human");
        assert_eq!(config.defaults.color, "auto");
        assert!(config.defaults.progress);
        assert_eq!(config.defaults.page_size, 1000);
        assert_eq!(config.defaults.delete_batch_size, 1000);
        assert_eq!(config.defaults.concurrency, 4);
        assert!(config.storage.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let config = Config {
            storage: Some(StorageConfig::new(
                "http://localhost:9000",
                "archive",
                "accesskey",
                "secretkey",
            )),
            ..Default::default()
        };

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        let storage = loaded.storage.unwrap();
        assert_eq!(storage.bucket, "archive");
        assert_eq!(storage.region, "us-east-1");
        assert_eq!(storage.bucket_lookup, "auto");
    }

    #[test]
    fn test_partial_defaults_are_filled_in() {
        let (manager, _temp_dir) = temp_config_manager();
        let content = r#"
            schema_version = 1

            [defaults]
            page_size = 250
        "#;
        std::fs::write(manager.config_path(), content).unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.defaults.page_size, 250);
        assert_eq!(config.defaults.delete_batch_size, 1000);
        assert!(config.defaults.progress);
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!(
            r#"
            schema_version = {}
            "#,
            SCHEMA_VERSION + 1
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }

    #[test]
    fn test_engine_options_are_clamped() {
        let defaults = Defaults {
            page_size: 5000,
            delete_batch_size: 0,
            concurrency: 0,
            ..Default::default()
        };
        let options = defaults.engine_options();
        assert_eq!(options.page_size, 1000);
        assert_eq!(options.delete_batch_size, 1);
        assert_eq!(options.concurrency, 1);
    }

    #[test]
    fn test_storage_validation() {
        let storage = StorageConfig::new("http://localhost:9000", "bucket", "a", "b");
        assert!(storage.validate().is_ok());
        assert!(storage.force_path_style());

        let bad_url = StorageConfig::new("not a url", "bucket", "a", "b");
        assert!(matches!(bad_url.validate(), Err(Error::InvalidUrl(_))));

        let no_bucket = StorageConfig::new("http://localhost:9000", "", "a", "b");
        assert!(matches!(no_bucket.validate(), Err(Error::Config(_))));

        let mut bad_lookup = StorageConfig::new("http://localhost:9000", "bucket", "a", "b");
        bad_lookup.bucket_lookup = "virtual".into();
        assert!(matches!(bad_lookup.validate(), Err(Error::Config(_))));
    }
}
