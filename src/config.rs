//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$SPAMFILTER_CONFIG` (environment variable)
//! 2. `~/.config/spamfilter/config.toml` (Linux)
//!    `~/Library/Application Support/spamfilter/config.toml` (macOS)
//!    `%APPDATA%\spamfilter\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! `$SPAMFILTER_MESSAGES_DIR` and `$SPAMFILTER_STATS_DIR` override the
//! `[data]` section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::classifier::DEFAULT_SPAM_THRESHOLD;

pub const CONFIG_ENV: &str = "SPAMFILTER_CONFIG";
pub const MESSAGES_DIR_ENV: &str = "SPAMFILTER_MESSAGES_DIR";
pub const STATS_DIR_ENV: &str = "SPAMFILTER_STATS_DIR";

/// Name of the log file written under [`Config::log_dir`].
pub const LOG_FILE_NAME: &str = "spamfilter.log";

const APP_DIR: &str = "spamfilter";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where training data lives.
    pub data: DataConfig,
    /// Term splitting.
    pub tokenizer: TokenizerConfig,
    /// Decision and training policy.
    pub classifier: ClassifierConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override log directory.
    pub log_dir: Option<PathBuf>,
}

/// Training data locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Pending and archived per-message records.
    pub messages_dir: Option<PathBuf>,
    /// Aggregate statistics, stop words and the processed log.
    pub stats_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Literal term separator. Unset splits on whitespace.
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Probability at or above which a message is spam.
    pub spam_threshold: f64,
    /// Merge right after training a single message.
    pub commit_on_train: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            spam_threshold: DEFAULT_SPAM_THRESHOLD,
            commit_on_train: true,
        }
    }
}

impl Config {
    /// Apply `SPAMFILTER_*_DIR` overrides found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        if let Some(dir) = non_empty(MESSAGES_DIR_ENV) {
            self.data.messages_dir = Some(dir);
        }
        if let Some(dir) = non_empty(STATS_DIR_ENV) {
            self.data.stats_dir = Some(dir);
        }
    }

    /// Directory of pending and archived message records.
    pub fn messages_dir(&self) -> PathBuf {
        self.data
            .messages_dir
            .clone()
            .unwrap_or_else(|| data_root().join("messages"))
    }

    /// Directory of the persisted aggregate.
    pub fn stats_dir(&self) -> PathBuf {
        self.data
            .stats_dir
            .clone()
            .unwrap_or_else(|| data_root().join("stats"))
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.general.log_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir().join(LOG_FILE_NAME)
    }
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Load configuration, searching standard locations, then apply
/// environment overrides.
///
/// Falls back to defaults if no file is found or on parse error.
pub fn load_config() -> Config {
    let mut config = read_config_file().unwrap_or_default();
    config.apply_env(|key| std::env::var(key).ok());
    config
}

fn read_config_file() -> Option<Config> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                None
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            None
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}
