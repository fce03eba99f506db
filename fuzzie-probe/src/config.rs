//! Configuration management

use anyhow::{Context, Result};
use fuzzie_governor::{MonitorOptions, PolicyThresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Heap budget reported as the memory limit (None = total system memory)
    pub heap_budget_mb: Option<u64>,

    /// Treat the session as if the user asked for reduced motion
    pub prefers_reduced_motion: bool,

    /// Synthetic frame rate driving the FPS counter (0 = no frame pump)
    pub frame_rate: u32,

    /// Sampling options
    pub monitor: MonitorOptions,

    /// Policy thresholds and budgets
    pub thresholds: PolicyThresholds,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            heap_budget_mb: None,
            prefers_reduced_motion: false,
            frame_rate: 60,
            monitor: MonitorOptions::default(),
            thresholds: PolicyThresholds::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path())
    }

    /// Load configuration from `config_path`, writing defaults there if the
    /// file does not exist yet
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context("Failed to read config file")?;

            let mut config: ProbeConfig = toml::from_str(&contents)
                .context("Failed to parse config file")?;

            config.config_path = config_path.to_path_buf();
            config.monitor
                .validate()
                .context("Invalid monitor options in config file")?;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.save()
                .context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Heap budget in bytes
    pub fn heap_budget_bytes(&self) -> Option<u64> {
        self.heap_budget_mb.map(|mb| mb * 1024 * 1024)
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fuzzie")
            .join("governor.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let path = ProbeConfig::default_config_path();
        assert!(path.ends_with("fuzzie/governor.toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ProbeConfig = toml::from_str(
            r#"
            frame_rate = 30

            [thresholds]
            low_fps = 45.0
            "#,
        )
        .unwrap();

        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.thresholds.low_fps, 45.0);
        assert_eq!(config.thresholds.particle_budget, 100);
        assert_eq!(config.monitor, MonitorOptions::default());
        assert_eq!(config.heap_budget_bytes(), None);
    }
}
