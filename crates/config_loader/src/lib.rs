//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply environment overrides
//! - Validate configuration legality
//! - Produce a `ServiceConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//!
//! let loaded = ConfigLoader::load(None).unwrap();
//! println!("feed: {}", loaded.config.feed.endpoint());
//! ```

mod env;
mod parser;
mod validator;

pub use contracts::ServiceConfig;
pub use env::{
    apply_env_overrides, apply_overrides_with, find_default_config, DEFAULT_CONFIG_PATHS,
};
pub use parser::ConfigFormat;
pub use validator::warnings;

use contracts::ContractError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A validated configuration and where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    /// `None` when built-in defaults were used
    pub source: Option<PathBuf>,
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve, load, override from the process environment and validate
    ///
    /// Without an explicit path the default locations are searched; when none
    /// exists the built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ContractError> {
        Self::load_with_env(explicit, |key| std::env::var(key).ok())
    }

    /// Same as [`ConfigLoader::load`] with an injected environment lookup
    pub fn load_with_env<F>(explicit: Option<&Path>, lookup: F) -> Result<LoadedConfig, ContractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_default_config(),
        };

        let mut config = match &source {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                Self::parse_file(path)?
            }
            None => {
                debug!("no configuration file found, using defaults");
                ServiceConfig::default()
            }
        };

        apply_overrides_with(&mut config, lookup)?;
        validator::validate(&config)?;

        Ok(LoadedConfig { config, source })
    }

    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    /// Environment overrides are not applied.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ServiceConfig, ContractError> {
        let config = Self::parse_file(path)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already built configuration (e.g. after CLI overrides)
    pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize ServiceConfig to TOML string
    pub fn to_toml(config: &ServiceConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ServiceConfig to JSON string
    pub fn to_json(config: &ServiceConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn parse_file(path: &Path) -> Result<ServiceConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        parser::parse(&content, format)
    }
}
