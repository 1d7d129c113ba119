//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;
use tracing::warn;

use super::ExecutorConfig;
use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "WEAVER";

/// Directory holding the suite schema of an installed distribution
const WEBWEAVER_PATH: &str = "WEBWEAVER_PATH";

/// Schema file name looked up under `WEBWEAVER_PATH`
pub const SCHEMA_FILE_NAME: &str = "suite_schema.json";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Schema path from WEAVER_SCHEMA
    pub schema: Option<PathBuf>,
    /// Config file from WEAVER_CONFIG
    pub config_file: Option<String>,
    /// Log level from WEAVER_LOG_LEVEL
    pub log_level: Option<LogLevel>,
    /// Output format from WEAVER_FORMAT
    pub format: Option<OutputFormat>,
    /// Worker bound from WEAVER_MAX_WORKERS
    pub max_workers: Option<usize>,
    /// Install directory from WEBWEAVER_PATH
    pub webweaver_path: Option<PathBuf>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}")).filter(|v| !v.is_empty());

        Self {
            schema: get("SCHEMA").map(PathBuf::from),
            config_file: get("CONFIG"),
            log_level: get("LOG_LEVEL").and_then(|v| parse_or_warn("LOG_LEVEL", &v)),
            format: get("FORMAT").and_then(|v| parse_or_warn("FORMAT", &v)),
            max_workers: get("MAX_WORKERS").and_then(|v| parse_or_warn("MAX_WORKERS", &v)),
            webweaver_path: lookup(WEBWEAVER_PATH)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.schema.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
            || self.format.is_some()
            || self.max_workers.is_some()
            || self.webweaver_path.is_some()
    }

    /// Schema path from the environment: `WEAVER_SCHEMA` first, then
    /// `WEBWEAVER_PATH/suite_schema.json`
    pub fn schema_path(&self) -> Option<PathBuf> {
        self.schema.clone().or_else(|| {
            self.webweaver_path
                .as_ref()
                .map(|dir| dir.join(SCHEMA_FILE_NAME))
        })
    }

    /// Override file settings with whatever the environment provides
    pub fn apply(&self, config: &mut ExecutorConfig) {
        if let Some(schema) = &self.schema {
            config.schema_path = Some(schema.clone());
        } else if config.schema_path.is_none() {
            config.schema_path = self.schema_path();
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(workers) = self.max_workers {
            config.max_workers = workers;
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring invalid {ENV_PREFIX}_{name} value '{value}'");
            None
        }
    }
}

/// Print all WEAVER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_SCHEMA        Path to the suite schema file");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!("  {ENV_PREFIX}_LOG_LEVEL     Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_FORMAT        Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_MAX_WORKERS   Worker bound for bare class runs");
    println!("  {WEBWEAVER_PATH}        Directory holding {SCHEMA_FILE_NAME}");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_FORMAT=summary");
    println!("  weaver-exec run suite.yaml");
}
