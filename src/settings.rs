use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::store::{load_document, save_document, DataDir};

pub const DATA_DIR_ENV: &str = "TALLY_DATA_DIR";

/// Process-level configuration, kept outside the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    /// Last user to log in; only a default for `--user`.
    #[serde(default)]
    pub user_name: String,
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            user_name: String::new(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("tally")
}

pub fn load_settings() -> Settings {
    load_document(&settings_path())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    save_document(&settings_path(), settings).map_err(|e| TallyError::Settings(e.to_string()))
}

/// `TALLY_DATA_DIR` wins over the saved setting.
pub fn get_data_dir() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(&load_settings().data_dir),
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

// ---------------------------------------------------------------------------
// Preferences (settings.json inside the data directory)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(default = "default_savings_goal")]
    pub savings_goal: f64,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

fn default_theme() -> String {
    "dark".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_savings_goal() -> f64 {
    1000.0
}

fn default_refresh_secs() -> u64 {
    30
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            currency: default_currency(),
            notifications: default_true(),
            savings_goal: default_savings_goal(),
            refresh_secs: default_refresh_secs(),
        }
    }
}

pub fn load_preferences(dir: &DataDir) -> Preferences {
    load_document(&dir.preferences())
}

pub fn save_preferences(dir: &DataDir, prefs: &Preferences) -> Result<()> {
    if !prefs.savings_goal.is_finite() || prefs.savings_goal < 0.0 {
        return Err(TallyError::Validation(format!(
            "Invalid savings goal: {}",
            prefs.savings_goal
        )));
    }
    if prefs.refresh_secs == 0 {
        return Err(TallyError::Validation(
            "Refresh interval must be at least 1 second".to_string(),
        ));
    }
    save_document(&dir.preferences(), prefs)
}
