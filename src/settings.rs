//! Persisted configuration
//!
//! The last-used origin domain, target domain, and cookie-name selection
//! survive between runs in a small JSON file. The on-disk keys and the
//! comma-joined selection format match the original storage layout, so
//! the file is stable across versions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecookieError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "origin-domain", default)]
    pub origin_domain: String,
    #[serde(rename = "target-domain", default)]
    pub target_domain: String,
    /// Comma-joined selected cookie names; empty means no selection
    #[serde(rename = "cookie-names", default)]
    cookie_names: String,
}

impl Settings {
    /// The selected cookie names as a list.
    pub fn selected_names(&self) -> Vec<String> {
        if self.cookie_names.is_empty() {
            return Vec::new();
        }
        self.cookie_names
            .split(',')
            .map(|name| name.to_string())
            .collect()
    }

    pub fn set_selected_names(&mut self, names: &[String]) {
        self.cookie_names = names.join(",");
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected_names().iter().any(|selected| selected == name)
    }

    /// Default settings file location.
    pub fn default_path() -> Result<PathBuf> {
        let config = dirs::config_dir()
            .ok_or_else(|| RecookieError::Config("Cannot determine config directory".to_string()))?;
        Ok(config.join("recookie").join("settings.json"))
    }

    /// Load settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)
            .map_err(|e| RecookieError::Settings(format!("Invalid settings file: {}", e)))?;
        Ok(settings)
    }

    /// Persist settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
