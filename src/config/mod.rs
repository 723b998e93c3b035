//! Configuration management for ragchat
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Progress pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Backend service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the document service
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Path of the multipart upload endpoint
    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Path of the JSON query endpoint
    #[serde(default = "default_query_path")]
    pub query_path: String,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Step-cycling timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Interval between ingestion step ticks (milliseconds)
    #[serde(default = "default_ingest_step_ms")]
    pub ingest_step_ms: u64,

    /// Interval between query step ticks (milliseconds)
    #[serde(default = "default_query_step_ms")]
    pub query_step_ms: u64,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for ragchat data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            upload_path: default_upload_path(),
            query_path: default_query_path(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest_step_ms: default_ingest_step_ms(),
            query_step_ms: default_query_step_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn ingest_step(&self) -> Duration {
        Duration::from_millis(self.ingest_step_ms)
    }

    pub fn query_step(&self) -> Duration {
        Duration::from_millis(self.query_step_ms)
    }
}

impl BackendConfig {
    /// Append an endpoint path to the base URL, keeping any base path prefix
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.base_url)?;
        if !base.path().ends_with('/') {
            let prefix = format!("{}/", base.path());
            base.set_path(&prefix);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid backend endpoint '{}': {}", path, e)))
    }

    pub fn upload_url(&self) -> Result<Url> {
        self.endpoint(&self.upload_path)
    }

    pub fn query_url(&self) -> Result<Url> {
        self.endpoint(&self.query_path)
    }
}

impl Config {
    /// Get the default base directory for ragchat (~/.ragchat)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ragchat")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config file, or the default location with fallback
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_from(None),
        }
    }

    /// Create a config rooted at the given base directory with default values
    pub fn with_base_dir(base_dir: Option<PathBuf>) -> Self {
        let mut config = Config::default();
        config.init_paths(base_dir);
        config
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.ingest_step_ms == 0 || self.pipeline.query_step_ms == 0 {
            return Err(Error::Config(
                "pipeline step intervals must be greater than zero".to_string(),
            ));
        }

        Url::parse(&self.backend.base_url).map_err(|e| {
            Error::Config(format!(
                "backend.base_url '{}' is not a valid URL: {}",
                self.backend.base_url, e
            ))
        })?;

        for (name, path) in [
            ("backend.upload_path", &self.backend.upload_path),
            ("backend.query_path", &self.backend.query_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!("{} must start with '/'", name)));
            }
        }

        Ok(())
    }
}
