//! Configuration system for the Area lock screen
//!
//! Loads configuration from TOML file at `~/.config/area/lock.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lock: LockConfig,
    pub widgets: WidgetsConfig,
    pub power: PowerConfig,
    pub backend: BackendConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse configuration text; missing keys fall back to defaults
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("lock.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Settings consumed by the shield state machine
    pub fn shield_settings(&self) -> ShieldSettings {
        ShieldSettings {
            lock_enabled: self.lock.enabled,
            lock_delay: Duration::from_secs(self.lock.delay_secs),
            ask_for_away_message: self.lock.ask_for_away_message,
            idle_fade: Duration::from_secs(self.lock.idle_fade_secs),
            floating_widgets: self.widgets.floating,
            float_interval: Duration::from_secs(self.widgets.float_interval_secs.max(1)),
            lock_on_suspend: self.power.lock_on_suspend,
        }
    }
}

/// Locking behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lock the session once the screensaver has been up for `delay_secs`
    pub enabled: bool,
    /// Seconds between the screensaver appearing and the session locking (0 = immediately)
    pub delay_secs: u64,
    /// Prompt for an away message when locking from the panel/keybinding
    pub ask_for_away_message: bool,
    /// Seconds to fade the screen out after going idle (0 = no fade, show immediately)
    pub idle_fade_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: 0,
            ask_for_away_message: false,
            idle_fade_secs: 0,
        }
    }
}

/// Screensaver widget behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetsConfig {
    /// Let idle widgets float around the screen instead of sitting at their anchors
    pub floating: bool,
    /// Seconds between floating layout changes
    pub float_interval_secs: u64,
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            floating: true,
            float_interval_secs: 30,
        }
    }
}

/// Power management integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Lock before the system suspends
    pub lock_on_suspend: bool,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            lock_on_suspend: true,
        }
    }
}

/// Lock backend RPC settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Timeout for calls into the lock backend, in milliseconds
    pub rpc_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: 2000,
        }
    }
}

impl BackendConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

/// Flattened runtime settings handed to the screen shield
#[derive(Debug, Clone, PartialEq)]
pub struct ShieldSettings {
    pub lock_enabled: bool,
    pub lock_delay: Duration,
    pub ask_for_away_message: bool,
    pub idle_fade: Duration,
    pub floating_widgets: bool,
    pub float_interval: Duration,
    pub lock_on_suspend: bool,
}

impl Default for ShieldSettings {
    fn default() -> Self {
        Config::default().shield_settings()
    }
}
