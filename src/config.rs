//! Configuration for the menu service
//!
//! Loads configuration from TOML file at `~/.config/area-menu/config.toml`
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
    pub service: ServiceConfig,
    pub grab: GrabConfig,
    pub appearance: AppearanceConfig,
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

        let config = Self::load_from(&config_path)?;
        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area-menu");

        Ok(config_dir.join("config.toml"))
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
}

/// Bus identity and restart behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Well-known name claimed on the session bus
    pub bus_name: String,
    /// Object path of the manager; sessions live below it
    pub manager_path: String,
    /// Window in which a second unregister restarts the service
    pub restart_grace_ms: u64,
    pub restart_enabled: bool,
}

impl ServiceConfig {
    pub fn restart_grace(&self) -> Duration {
        Duration::from_millis(self.restart_grace_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bus_name: "com.deepin.menu".to_string(),
            manager_path: "/com/deepin/menu".to_string(),
            restart_grace_ms: 5000,
            restart_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Attempts per pointer/keyboard grab before giving up
    pub retry_attempts: u32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self { retry_attempts: 200 }
    }
}

/// Menu surface geometry and colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Row height in pixels
    pub item_height: u16,
    pub separator_height: u16,
    pub min_width: u16,
    /// Horizontal text padding in pixels
    pub padding: u16,
    /// Core X font used for item labels
    pub font: String,
    /// Background color (hex: 0xRRGGBB)
    pub background: u32,
    /// Label color (hex: 0xRRGGBB)
    pub foreground: u32,
    /// Label color of inactive items (hex: 0xRRGGBB)
    pub inactive: u32,
    /// Selected row color (hex: 0xRRGGBB)
    pub highlight: u32,
    /// Border color (hex: 0xRRGGBB)
    pub border: u32,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        // Nord Theme Colors
        Self {
            item_height: 24,
            separator_height: 8,
            min_width: 140,
            padding: 12,
            font: "fixed".to_string(),
            background: 0x2e3440, // Polar Night Darkest
            foreground: 0xeceff4, // Snow Storm
            inactive: 0x4c566a,   // Polar Night Lightest
            highlight: 0x5e81ac,  // Frost Blue
            border: 0x3b4252,     // Polar Night Lighter
        }
    }
}
