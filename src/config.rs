use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::logging::{LoggingConfig, VALID_FORMATS, VALID_LEVELS};
use crate::uevent::MulticastGroup;

/// Main monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Kernel event channel settings
    pub channel: ChannelConfig,

    /// Device label lookup
    pub enrichment: EnrichmentConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Kernel event channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Netlink multicast group (kernel or udev)
    pub group: MulticastGroup,

    /// How long a single read waits before re-checking for shutdown
    pub read_timeout_ms: u64,
}

/// Enrichment (lsusb / lsblk) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Use external tools for labels; uevent fields only when disabled
    pub enabled: bool,

    pub lsusb_program: String,

    pub lsblk_program: String,

    /// Upper bound on a single lookup command
    pub command_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            group: MulticastGroup::Kernel,
            read_timeout_ms: 1000,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lsusb_program: "lsusb".to_string(),
            lsblk_program: "lsblk".to_string(),
            command_timeout_ms: 2000,
        }
    }
}

impl ChannelConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: MonitorConfig = toml::from_str(&content)
            .context("Failed to parse TOML configuration")?;

        config.validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        std::fs::write(path, content)
            .context(format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Create development configuration
    pub fn development() -> Self {
        Self {
            channel: ChannelConfig {
                group: MulticastGroup::Kernel,
                read_timeout_ms: 250,
            },
            enrichment: EnrichmentConfig::default(),
            logging: LoggingConfig::development(),
        }
    }

    /// Create production configuration
    pub fn production() -> Self {
        Self {
            channel: ChannelConfig {
                group: MulticastGroup::Udev,
                read_timeout_ms: 1000,
            },
            enrichment: EnrichmentConfig {
                command_timeout_ms: 5000,
                ..EnrichmentConfig::default()
            },
            logging: LoggingConfig::production(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroReadTimeout);
        }

        if self.enrichment.enabled {
            if self.enrichment.command_timeout_ms == 0 {
                return Err(ConfigError::ZeroCommandTimeout);
            }
            if self.enrichment.lsusb_program.trim().is_empty() {
                return Err(ConfigError::EmptyProgram("lsusb"));
            }
            if self.enrichment.lsblk_program.trim().is_empty() {
                return Err(ConfigError::EmptyProgram("lsblk"));
            }
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.logging.format.clone()));
        }

        Ok(())
    }

    /// Get configuration file path based on environment
    pub fn default_config_path() -> PathBuf {
        let mut path = PathBuf::from(
            std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                format!("{}/.config", home)
            })
        );
        path.push("usbwatch");
        path.push("config.toml");
        path
    }

    /// Override configuration with environment variables
    pub fn apply_env_overrides(&mut self) {
        // Logging overrides
        if let Ok(level) = std::env::var("USBWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("USBWATCH_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Channel overrides
        if let Ok(group) = std::env::var("USBWATCH_GROUP") {
            if let Ok(group) = group.parse() {
                self.channel.group = group;
            }
        }

        if let Ok(timeout) = std::env::var("USBWATCH_READ_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.channel.read_timeout_ms = ms;
            }
        }

        // Enrichment overrides
        if let Ok(enable) = std::env::var("USBWATCH_ENRICH") {
            self.enrichment.enabled = enable.parse().unwrap_or(true);
        }
    }
}
