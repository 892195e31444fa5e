//! Configuration file support for Wolfwalk.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/wolfwalk/config.toml`.
//! Every section is optional.

use crate::routine::{default_plan, RoutinePlan};
use crate::session::SessionSettings;
use crate::types::WorkoutLength;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub workout: WorkoutConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
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

/// Routine selection
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct WorkoutConfig {
    #[serde(default)]
    pub default_length: WorkoutLength,

    /// Custom routine in TOML; the built-in routine is used when unset
    #[serde(default)]
    pub routine_file: Option<PathBuf>,
}

/// Timer cadence and delays
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimerConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    #[serde(default = "default_side_switch_delay_ms")]
    pub side_switch_delay_ms: u64,

    #[serde(default = "default_go_hold_ms")]
    pub go_hold_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            side_switch_delay_ms: default_side_switch_delay_ms(),
            go_hold_ms: default_go_hold_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "default_audio_enabled")]
    pub enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_audio_enabled(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("wolfwalk")
}

fn default_sample_interval_ms() -> u64 {
    250
}

fn default_side_switch_delay_ms() -> u64 {
    500
}

fn default_go_hold_ms() -> u64 {
    500
}

fn default_audio_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
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
        base.join("wolfwalk").join("config.toml")
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

    pub fn validate(&self) -> Result<()> {
        if self.timer.sample_interval_ms == 0 || self.timer.sample_interval_ms > 1000 {
            return Err(Error::Config(format!(
                "timer.sample_interval_ms must be between 1 and 1000, got {}",
                self.timer.sample_interval_ms
            )));
        }
        Ok(())
    }

    /// Directory holding the key-value store files.
    pub fn store_dir(&self) -> PathBuf {
        self.data.data_dir.join("store")
    }

    /// JSONL file of completed sessions.
    pub fn journal_path(&self) -> PathBuf {
        self.data.data_dir.join("journal").join("sessions.jsonl")
    }

    /// Default CSV export target.
    pub fn export_path(&self) -> PathBuf {
        self.data.data_dir.join("sessions.csv")
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            side_switch_delay_ms: self.timer.side_switch_delay_ms,
            go_hold_ms: self.timer.go_hold_ms,
        }
    }

    /// The configured routine plan, falling back to the built-in one.
    pub fn routine_plan(&self) -> Result<RoutinePlan> {
        match &self.workout.routine_file {
            Some(path) => RoutinePlan::load_from(path),
            None => Ok(default_plan().clone()),
        }
    }
}
