use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Display unit system. Affects request parameters only; nothing stored
/// on disk depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of the provider's `units` query parameter.
    pub fn as_query_param(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query_param())
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// weather_api_key = "..."
/// save_search_history = true
/// temp_type = "metric"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeatherMap API key. Empty means not configured yet.
    pub weather_api_key: String,

    /// When false, selections update the display but nothing is written
    /// to the location store.
    pub save_search_history: bool,

    /// Unit system used for requests and display.
    pub temp_type: Units,

    /// Override for the location store path. `None` uses the platform
    /// data directory.
    pub search_history_file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather_api_key: String::new(),
            save_search_history: true,
            temp_type: Units::Metric,
            search_history_file_path: None,
        }
    }
}

impl Config {
    /// True once a non-empty API key has been configured.
    pub fn has_api_key(&self) -> bool {
        !self.weather_api_key.trim().is_empty()
    }

    /// Load config from disk, or return defaults if no file exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub(crate) fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("failed to create {}: {e}", parent.display())))?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize configuration: {e}")))?;

        fs::write(path, toml)
            .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Path of the location store: the configured override, or
    /// `weather_store.json` in the platform data directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.search_history_file_path {
            return Ok(path.clone());
        }

        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("weather_store.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weathervane", "weathervane")
        .ok_or_else(|| Error::Config("could not determine platform config directory".into()))
}
