//! Configuration loading from TOML files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sheetfill_extract::{ApiConfig, BatchConfig, SheetLayout, DEFAULT_ENDPOINT};
use sheetfill_store::default_checkpoint_path;

/// Global configuration for sheetfill
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sheet: SheetConfig,
    pub api: EndpointConfig,
    pub batch: BatchLimits,
    pub checkpoint: CheckpointConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub path: PathBuf,
    pub start_row: usize,
    pub url_column: usize,
    pub output_column: usize,
}

impl Default for SheetConfig {
    fn default() -> Self {
        let layout = SheetLayout::default();
        Self {
            path: PathBuf::from("contacts.csv"),
            start_row: layout.start_row,
            url_column: layout.url_column,
            output_column: layout.output_column,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Extra request headers; values may be `${VAR}` references
    pub headers: BTreeMap<String, String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: ApiConfig::default().timeout.as_secs(),
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BatchLimits {
    pub size: usize,
    pub time_budget_secs: u64,
    pub delay_ms: u64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        let batch = BatchConfig::default();
        Self {
            size: batch.batch_size,
            time_budget_secs: batch.time_budget.as_secs(),
            delay_ms: batch.delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Defaults to `<sheet>.checkpoint.json`
    pub path: Option<PathBuf>,
    pub key: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: None,
            key: BatchConfig::default().cursor_key,
        }
    }
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./sheetfill.toml (current directory)
    /// 2. ~/.config/sheetfill/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("sheetfill.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "sheetfill") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint
            .path
            .clone()
            .unwrap_or_else(|| default_checkpoint_path(&self.sheet.path))
    }

    /// Runner settings, validated.
    pub fn batch_config(&self) -> Result<BatchConfig> {
        let config = BatchConfig {
            layout: SheetLayout {
                start_row: self.sheet.start_row,
                url_column: self.sheet.url_column,
                output_column: self.sheet.output_column,
            },
            batch_size: self.batch.size,
            time_budget: Duration::from_secs(self.batch.time_budget_secs),
            delay: Duration::from_millis(self.batch.delay_ms),
            cursor_key: self.checkpoint.key.clone(),
        };
        config.validate().context("Invalid batch configuration")?;
        Ok(config)
    }

    /// Extraction client settings with header values expanded.
    pub fn api_config(&self) -> Result<ApiConfig> {
        anyhow::ensure!(self.api.timeout_secs > 0, "api.timeout_secs must be positive");
        let headers = self
            .api
            .headers
            .iter()
            .map(|(name, raw)| {
                let value = expand_env_var(raw).with_context(|| {
                    format!("Header {name} references unset environment variable {raw}")
                })?;
                Ok((name.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ApiConfig {
            endpoint: self.api.endpoint.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            headers,
        })
    }
}
