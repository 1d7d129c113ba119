//! Configuration module
//!
//! Handles loading and managing executor configuration.

mod env;

pub use env::{print_env_help, EnvConfig, SCHEMA_FILE_NAME};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::executor::DEFAULT_MAX_WORKERS;
use crate::output::OutputFormat;
use crate::suite::is_yaml_file;
use crate::utils::LogLevel;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./weaver-exec.yaml",
    "./weaver-exec.yml",
    "./weaver-exec.json",
    "./.weaver-exec.yaml",
    "~/.config/weaver-exec/config.yaml",
    "~/.weaver-exec.yaml",
];

/// Executor configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Suite schema; the bundled schema is used when unset
    pub schema_path: Option<PathBuf>,

    /// Worker bound used when running a bare list of classes
    pub max_workers: usize,

    pub log_level: LogLevel,

    pub format: OutputFormat,

    pub colorize: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            max_workers: DEFAULT_MAX_WORKERS,
            log_level: LogLevel::default(),
            format: OutputFormat::default(),
            colorize: true,
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Find a configuration file in the standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path wins over `WEAVER_CONFIG`, which wins over the standard
    /// locations. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_deref().map(expand_path))
            .or_else(Self::find);

        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        env.apply(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            anyhow::bail!("max_workers must be at least 1");
        }
        if let Some(path) = &self.schema_path {
            if !path.exists() {
                anyhow::bail!("Schema file '{}' not found.", path.display());
            }
        }
        Ok(())
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
