//! CLI configuration.
//!
//! Loaded from TOML: `--config` / `$STRATA_CONFIG`, else
//! `<config_dir>/strata/config.toml` when it exists, else defaults.

use crate::cli::LogLevel;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_query::CompileOptions;

/// Set to skip the user's config file (used by tests)
pub const TEST_MODE_ENV: &str = "STRATA_TEST_MODE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Names of internal keys and labels, page sizes
    pub compiler: CompileOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `--log-level` nor `--verbose` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl CliConfig {
    /// Load configuration, preferring an explicit file.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = config_file {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::from_file(&path);
        }
        Self::from_file_or_default()
    }

    fn from_file_or_default() -> Result<Self> {
        if std::env::var_os(TEST_MODE_ENV).is_some() {
            return Ok(Self::default());
        }

        match Self::default_config_path().ok().filter(|p| p.exists()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("strata");
        Ok(config_dir.join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
