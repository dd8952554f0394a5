//! Configuration management for the eventscout CLI.
//!
//! Settings come from:
//! 1. Default values
//! 2. Config file (`~/.eventscout/config.toml`)
//! 3. Environment variables (credentials only)

mod schema;

pub use schema::AppConfig;

use std::path::{Path, PathBuf};

use eventscout::runner::RunOptions;
use eventscout::search::GoogleSearchConfig;
use tracing::{debug, info};

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// The config file already exists.
    #[error("config file already exists: {0}")]
    AlreadyExists(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eventscout")
}

/// Get the default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a specific path, or defaults if it is missing.
pub async fn load_config_from(path: &Path) -> ConfigResult<AppConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: AppConfig = toml::from_str(&content)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Save configuration to a specific path.
pub async fn save_config_to(config: &AppConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = toml::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "saved config file");

    Ok(())
}

/// Write a default config file. Refuses to overwrite unless `force` is set.
pub async fn init_config_at(path: &Path, force: bool) -> ConfigResult<AppConfig> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.display().to_string()));
    }

    let config = AppConfig::default();
    save_config_to(&config, path).await?;
    Ok(config)
}

impl AppConfig {
    /// Runner options derived from the model section.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::default()
            .with_max_output_tokens(self.model.max_output_tokens)
            .with_temperature(self.model.temperature);
        if let Some(model) = &self.model.name {
            options = options.with_model(model.clone());
        }
        options
    }

    /// Apply the search section on top of an environment-derived config.
    #[must_use]
    pub fn apply_search(&self, mut config: GoogleSearchConfig) -> GoogleSearchConfig {
        if let Some(url) = &self.search.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(secs) = self.search.timeout_secs {
            config = config.with_timeout(secs);
        }
        config
    }
}
