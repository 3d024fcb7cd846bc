//! Configuration file support for drinklog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/drinklog/config.toml`.

use crate::live::LiveSettings;
use crate::{DistributionCategory, Error, Profile, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest accepted live lookback window (one year)
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 365;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub live: LiveConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Path of the drink log inside `data_dir`
    pub fn log_path(data_dir: &Path) -> PathBuf {
        data_dir.join("drinks.jsonl")
    }
}

/// Body parameters used by the estimate; both unset by default
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_kg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<DistributionCategory>,
}

impl ProfileConfig {
    pub fn to_profile(&self) -> Profile {
        Profile {
            mass_kg: self.mass_kg,
            category: self.category,
        }
    }
}

/// Live estimate refresh configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            lookback_hours: default_lookback_hours(),
        }
    }
}

impl LiveConfig {
    pub fn to_settings(&self) -> LiveSettings {
        LiveSettings {
            refresh_interval: std::time::Duration::from_secs(self.refresh_interval_secs),
            lookback: chrono::Duration::hours(self.lookback_hours.clamp(1, MAX_LOOKBACK_HOURS)),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join("drinklog")
}

fn default_refresh_interval_secs() -> u64 {
    10
}

fn default_lookback_hours() -> i64 {
    24
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
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
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join("drinklog").join("config.toml")
    }

    /// Reject values that would stall the live driver or misstate the profile
    pub fn validate(&self) -> Result<()> {
        if self.live.refresh_interval_secs == 0 {
            return Err(Error::Config(
                "live.refresh_interval_secs must be at least 1".into(),
            ));
        }
        if !(1..=MAX_LOOKBACK_HOURS).contains(&self.live.lookback_hours) {
            return Err(Error::Config(format!(
                "live.lookback_hours must be between 1 and {}, got {}",
                MAX_LOOKBACK_HOURS, self.live.lookback_hours
            )));
        }
        if let Some(mass) = self.profile.mass_kg {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(Error::Config(format!(
                    "profile.mass_kg must be a positive number, got {}",
                    mass
                )));
            }
        }
        Ok(())
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
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
