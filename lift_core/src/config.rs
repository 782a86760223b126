//! Configuration file support for Lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::calendar::Calendar;
use crate::catalog::CatalogSource;
use crate::types::Exercise;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub exercises: ExercisesConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_store_file")]
    pub store_file: String,

    #[serde(default = "default_exercises_file")]
    pub exercises_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_file: default_store_file(),
            exercises_file: default_exercises_file(),
        }
    }
}

impl DataConfig {
    pub fn store_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.store_file)
    }

    pub fn exercises_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.exercises_file)
    }
}

/// Calendar-day configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CalendarConfig {
    /// Offset east of UTC used to decide which day a session is on
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Extra exercises merged into the catalog after the built-ins
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExercisesConfig {
    #[serde(default)]
    pub custom: Vec<Exercise>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("lift")
}

fn default_store_file() -> String {
    "workouts.json".into()
}

fn default_exercises_file() -> String {
    "exercises.json".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("lift").join("config.toml")
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.calendar()?;
        if self.data.store_file.trim().is_empty() {
            return Err(Error::Config("data.store_file must not be empty".into()));
        }
        if self.data.exercises_file.trim().is_empty() {
            return Err(Error::Config("data.exercises_file must not be empty".into()));
        }
        Ok(())
    }

    pub fn calendar(&self) -> Result<Calendar> {
        Calendar::from_offset_minutes(self.calendar.utc_offset_minutes)
    }

    /// Catalog sources in load order: built-ins, config, user file
    pub fn catalog_sources(&self, data_dir: &Path) -> Vec<CatalogSource> {
        vec![
            CatalogSource::BuiltIn,
            CatalogSource::Custom(self.exercises.custom.clone()),
            CatalogSource::File(self.data.exercises_path(data_dir)),
        ]
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
