//! Configuration for the measurement recorder.
//!
//! This is the recorder's own configuration (where things live, warm-up
//! policy). User-facing settings such as enabled sensors and sampling rates
//! live in the settings store; see [`crate::settings`].

use crate::session::{LeadingZeroPolicy, RecorderOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the file store; sessions go under `files/` below it
    pub base_path: PathBuf,

    /// JSON file backing the settings store
    pub settings_path: PathBuf,

    /// Path for recording statistics
    pub data_path: PathBuf,

    /// Drop all-zero motion samples reported before the first real one
    #[serde(default = "default_true")]
    pub discard_leading_zero_samples: bool,

    /// Period of the elapsed-time ticker (in seconds)
    #[serde(with = "duration_serde", default = "default_tick")]
    pub tick_interval: Duration,
}

fn default_true() -> bool {
    true
}

fn default_tick() -> Duration {
    Duration::from_secs(1)
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("measurement-recorder");

        Self {
            base_path: data_dir.clone(),
            settings_path: data_dir.join("settings.json"),
            data_path: data_dir,
            discard_leading_zero_samples: true,
            tick_interval: default_tick(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("measurement-recorder")
            .join("config.json")
    }

    /// Path of the persisted recording statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("recording-stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.base_path)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Controller options derived from this configuration.
    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions {
            leading_zero: if self.discard_leading_zero_samples {
                LeadingZeroPolicy::DiscardLeading
            } else {
                LeadingZeroPolicy::Keep
            },
            tick_period: self.tick_interval,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.discard_leading_zero_samples);
        assert!(config.settings_path.ends_with("settings.json"));
        assert_eq!(
            config.recorder_options().leading_zero,
            LeadingZeroPolicy::DiscardLeading
        );
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let json = r#"{"base_path": "/tmp/m", "settings_path": "/tmp/m/s.json", "data_path": "/tmp/m"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.discard_leading_zero_samples);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_keep_policy_from_config() {
        let config = Config {
            discard_leading_zero_samples: false,
            ..Config::default()
        };
        assert_eq!(config.recorder_options().leading_zero, LeadingZeroPolicy::Keep);
    }
}
