use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Provider;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub intake: IntakeConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    /// Directory holding one subdirectory per provider.
    pub root: PathBuf,
    #[serde(default = "default_providers")]
    pub providers: Vec<Provider>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_providers() -> Vec<Provider> {
    Provider::ALL.to_vec()
}
fn default_delimiter() -> String {
    ",".to_string()
}

impl IntakeConfig {
    pub fn provider_dir(&self, provider: Provider) -> PathBuf {
        self.root.join(provider.as_str())
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.providers.contains(&provider)
    }

    /// Enabled providers in the fixed scan order, regardless of the order
    /// they were listed in.
    pub fn enabled_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.is_enabled(*p))
            .collect()
    }

    /// Delimiter as a single byte. Validated by [`load_config`].
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// Whether a failed file (or provider) aborts the rest of the scan.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Propagate the first file-level failure to the caller.
    #[default]
    Strict,
    /// Log the failure, record it in the ledger, and keep going.
    Lenient,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default = "default_stuck_after_secs")]
    pub stuck_after_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_records_per_file: default_max_records_per_file(),
            failure_mode: FailureMode::Strict,
            stuck_after_secs: default_stuck_after_secs(),
        }
    }
}

fn default_max_records_per_file() -> usize {
    10_000
}
fn default_stuck_after_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate intake
    if config.intake.providers.is_empty() {
        bail!("intake.providers must name at least one provider");
    }
    for (i, provider) in config.intake.providers.iter().enumerate() {
        if config.intake.providers[..i].contains(provider) {
            bail!("intake.providers lists '{}' more than once", provider);
        }
    }
    let delim = config.intake.delimiter.as_bytes();
    if delim.len() != 1 {
        bail!(
            "intake.delimiter must be a single ASCII character, got '{}'",
            config.intake.delimiter
        );
    }
    if matches!(delim[0], b'"' | b'\n' | b'\r') {
        bail!(
            "intake.delimiter cannot be a quote or line break, got {:?}",
            config.intake.delimiter
        );
    }

    // Validate loader
    if config.loader.max_records_per_file == 0 {
        bail!("loader.max_records_per_file must be > 0");
    }
    if config.loader.stuck_after_secs == 0 {
        bail!("loader.stuck_after_secs must be > 0");
    }
    if i64::try_from(config.loader.stuck_after_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .is_none()
    {
        bail!(
            "loader.stuck_after_secs is too large: {}",
            config.loader.stuck_after_secs
        );
    }

    // Validate scheduler
    if config.scheduler.interval_secs == 0 {
        bail!("scheduler.interval_secs must be > 0");
    }

    Ok(())
}
