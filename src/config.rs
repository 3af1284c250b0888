//! Desk configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::NewCatalogRecord;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Root of the file store holding the order tables
    pub data_dir: PathBuf,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,

    /// Mailbox size of every service
    pub mailbox_size: usize,

    /// JSON array of catalog records loaded into the ULD backend at startup
    pub catalog_seed: Option<PathBuf>,

    pub require_balanced_flow_to_publish: bool,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/desk"),
            log_filter: "info".to_string(),
            mailbox_size: 32,
            catalog_seed: None,
            require_balanced_flow_to_publish: true,
        }
    }
}

impl DeskConfig {
    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: DeskConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = DeskConfig::default();

        if let Some(dir) = lookup("DESK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(filter) = lookup("DESK_LOG") {
            config.log_filter = filter;
        }

        if let Some(size) = lookup("DESK_MAILBOX_SIZE") {
            config.mailbox_size = size
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("DESK_MAILBOX_SIZE={size}")))?;
        }

        if let Some(seed) = lookup("DESK_CATALOG_SEED") {
            config.catalog_seed = Some(PathBuf::from(seed));
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_size == 0 {
            return Err(ConfigError::Invalid("mailbox_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Records from `catalog_seed`, or none when no seed is configured.
    pub fn load_catalog_seed(&self) -> Result<Vec<NewCatalogRecord>, ConfigError> {
        let Some(path) = &self.catalog_seed else {
            return Ok(Vec::new());
        };
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
    }
}
