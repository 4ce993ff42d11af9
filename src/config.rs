//! Configuration management for the fpsensord daemon.
//!
//! Handles loading, parsing, and validation of the YAML configuration file
//! that describes the board wiring and runtime tunables.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::RwLock;

/// Main configuration structure for the fpsensord daemon.
///
/// # Example
///
/// ```yaml
/// version: 1
/// wake_hold_ms: 1000
/// nav_events: true
///
/// board:
///   chip: /dev/gpiochip0
///   reset_line: 12
///   irq_line: 13
///   power_line: 14
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// How long the wake guard holds the system awake after an interrupt,
    /// in milliseconds.
    #[serde(default = "defaults::wake_hold_ms")]
    pub wake_hold_ms: u64,

    /// Whether navigation gesture commands produce input events.
    #[serde(default = "defaults::nav_events")]
    pub nav_events: bool,

    /// Buffered capacity of the event broadcast channel.
    #[serde(default = "defaults::event_capacity")]
    pub event_capacity: usize,

    /// Name the virtual input device registers under.
    #[serde(default = "defaults::input_device_name")]
    pub input_device_name: String,

    /// GPIO wiring of the sensor.
    #[serde(default)]
    pub board: BoardCfg,
}

/// GPIO wiring section.
///
/// Line offsets are optional here so a config can be staged before the
/// board's device tree is known; the reinit path rejects incomplete wiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCfg {
    /// Path to the GPIO character device.
    #[serde(default = "defaults::chip")]
    pub chip: PathBuf,

    /// Reset line offset.
    #[serde(default)]
    pub reset_line: Option<u32>,

    /// Interrupt line offset.
    #[serde(default)]
    pub irq_line: Option<u32>,

    /// Power enable line offset.
    #[serde(default)]
    pub power_line: Option<u32>,
}

impl Default for BoardCfg {
    fn default() -> Self {
        Self {
            chip: defaults::chip(),
            reset_line: None,
            irq_line: None,
            power_line: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            wake_hold_ms: defaults::wake_hold_ms(),
            nav_events: defaults::nav_events(),
            event_capacity: defaults::event_capacity(),
            input_device_name: defaults::input_device_name(),
            board: BoardCfg::default(),
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.wake_hold_ms == 0 {
            anyhow::bail!("wake_hold_ms must be greater than zero");
        }
        if self.event_capacity == 0 {
            anyhow::bail!("event_capacity must be greater than zero");
        }
        if self.input_device_name.is_empty() {
            anyhow::bail!("input_device_name must not be empty");
        }
        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn wake_hold_ms() -> u64 {
        1000
    }

    pub fn nav_events() -> bool {
        true
    }

    pub fn event_capacity() -> usize {
        100
    }

    pub fn input_device_name() -> String {
        "fpsensor-keys".to_string()
    }

    pub fn chip() -> PathBuf {
        PathBuf::from("/dev/gpiochip0")
    }
}

fn locate_config() -> Result<PathBuf> {
    // 2) ENV
    if let Ok(env_path) = env::var("FPSENSORD_CONFIG") {
        return Ok(PathBuf::from(env_path));
    }

    // 3) XDG_CONFIG_HOME or $HOME/.config
    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("fpsensord/config.yml");
        if cfg_dir.exists() {
            return Ok(cfg_dir.clone());
        }
    }

    // 4) /etc
    let etc = Path::new("/etc/fpsensord/config.yml");
    if etc.exists() {
        return Ok(etc.to_path_buf());
    }

    anyhow::bail!("Configuration file not found in any standard location")
}

/// Configuration manager that handles both config data and file operations.
///
/// Provides a unified interface for loading, reloading, and sharing
/// configuration without exposing the underlying file path to the rest of
/// the application.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    path: Option<PathBuf>,
}

impl ConfigManager {
    /// Creates an in-memory manager with no backing file.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// Loads configuration from file or standard locations.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. FPSENSORD_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/fpsensord/config.yml or ~/.config/fpsensord/config.yml
    /// 4. /etc/fpsensord/config.yml
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => locate_config().context("No configuration file found")?,
        };

        info!("Loading config from: {}", config_path.display());
        let config = Self::load_config_from_path(&config_path).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            path: Some(config_path),
        })
    }

    /// Gets a read-only reference to the current configuration.
    pub async fn get(&self) -> tokio::sync::RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Returns the path to the configuration file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reloads configuration from the same file.
    pub async fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            anyhow::bail!("Configuration has no backing file to reload from");
        };

        info!("Reloading config from: {}", path.display());
        let new_config = Self::load_config_from_path(path).await?;

        *self.config.write().await = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Clones the current configuration.
    pub async fn clone_config(&self) -> Config {
        self.config.read().await.clone()
    }

    async fn load_config_from_path(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[tokio::test]
    async fn config_load_valid_yaml() {
        let yaml_content = r#"
version: 1
wake_hold_ms: 500
nav_events: false
event_capacity: 32
input_device_name: "test-keys"

board:
  chip: /dev/gpiochip2
  reset_line: 12
  irq_line: 13
  power_line: 14
"#;

        let temp_file = create_temp_config(yaml_content);
        let manager = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap();
        let config = manager.clone_config().await;

        assert_eq!(config.version, 1);
        assert_eq!(config.wake_hold_ms, 500);
        assert_eq!(config.nav_events, false);
        assert_eq!(config.event_capacity, 32);
        assert_eq!(config.input_device_name, "test-keys");
        assert_eq!(config.board.chip, PathBuf::from("/dev/gpiochip2"));
        assert_eq!(config.board.reset_line, Some(12));
        assert_eq!(config.board.irq_line, Some(13));
        assert_eq!(config.board.power_line, Some(14));
    }

    #[tokio::test]
    async fn config_load_applies_defaults() {
        let temp_file = create_temp_config("version: 1\n");
        let manager = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap();
        let config = manager.clone_config().await;

        assert_eq!(config.wake_hold_ms, 1000);
        assert_eq!(config.nav_events, true);
        assert_eq!(config.event_capacity, 100);
        assert_eq!(config.input_device_name, "fpsensor-keys");
        assert_eq!(config.board, BoardCfg::default());
    }

    #[tokio::test]
    async fn config_load_rejects_unsupported_version() {
        let temp_file = create_temp_config("version: 2\n");
        let err = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported config version"));
    }

    #[tokio::test]
    async fn config_reload_picks_up_changes() {
        let temp_file = create_temp_config("version: 1\nwake_hold_ms: 100\n");
        let manager = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(manager.get().await.wake_hold_ms, 100);

        fs::write(temp_file.path(), "version: 1\nwake_hold_ms: 250\n").unwrap();
        manager.reload().await.unwrap();
        assert_eq!(manager.get().await.wake_hold_ms, 250);
    }

    #[tokio::test]
    async fn in_memory_manager_has_no_backing_file() {
        let manager = ConfigManager::new(Config::default());
        assert_eq!(manager.path(), None);
        assert!(manager.reload().await.is_err());
    }

    #[test]
    fn validate_rejects_zero_tunables() {
        let mut config = Config::default();
        config.wake_hold_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.event_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input_device_name = String::new();
        assert!(config.validate().is_err());
    }
}
