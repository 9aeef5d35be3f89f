//! Configuration types and parsing.
//!
//! One file configures every helper. Each subcommand only reads its own
//! section; the rest is still parsed and validated so typos surface early.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use toml::Table;

use crate::error::{Error, Result};

/// Embedded default configuration TOML, compiled into the binary.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../../config.toml");

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Path where config was found, if any.
    pub source: Option<PathBuf>,
    /// Whether defaults were used (no config file found).
    pub used_defaults: bool,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub battery: BatteryConfig,
    pub temperature: TemperatureConfig,
    pub system: SystemConfig,
    pub bluetooth: BluetoothConfig,
    pub menu: MenuConfig,
    pub cava: CavaConfig,
}

impl Config {
    /// Load configuration from the embedded default TOML string.
    pub fn from_default_toml() -> Result<Self> {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TOML)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, merging with embedded defaults.
    ///
    /// Returns an error if the file doesn't exist or can't be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::load_with_defaults(&content)
    }

    /// Parse both the default and the user config as TOML tables, deep-merge
    /// them (user values win), then deserialize the result.
    fn load_with_defaults(user_toml: &str) -> Result<Self> {
        let mut base: Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let user: Table = toml::from_str(user_toml)?;

        deep_merge_toml(&mut base, user);

        let config: Config = base.try_into()?;
        Ok(config)
    }

    /// Find and load configuration using the XDG lookup chain.
    ///
    /// If `explicit_path` is `Some`, that path is used directly and an error
    /// is returned if it doesn't exist or can't be parsed (no fallback).
    ///
    /// Otherwise searches, in order:
    /// 1. `$XDG_CONFIG_HOME/polystatus/config.toml`
    /// 2. `~/.config/polystatus/config.toml`
    /// 3. `./config.toml`
    ///
    /// A file that exists but fails to load is an error. Only when no file
    /// exists at all are the embedded defaults used.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<ConfigLoadResult> {
        if let Some(path) = explicit_path {
            let config = Self::load(path)?;
            return Ok(ConfigLoadResult {
                config,
                source: Some(path.to_path_buf()),
                used_defaults: false,
            });
        }

        let search_paths = Self::config_search_paths();

        for path in &search_paths {
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => {
                    return Ok(ConfigLoadResult {
                        config,
                        source: Some(path.clone()),
                        used_defaults: false,
                    });
                }
                Err(e) => {
                    tracing::error!("Config file {:?} exists but failed to load: {}", path, e);
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            "No config file found, using built-in defaults (searched: {})",
            search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(ConfigLoadResult {
            config: Self::from_default_toml()?,
            source: None,
            used_defaults: true,
        })
    }

    /// Get the list of paths to search for config files.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("polystatus/config.toml"));
        }

        if let Ok(home) = env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/polystatus/config.toml"));
        }

        paths.push(PathBuf::from("config.toml"));

        paths
    }

    /// Validate the configuration, returning every invalid value at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.battery.device.trim().is_empty() {
            errors.push("battery.device: must not be empty".to_string());
        }
        if self.battery.poll_interval_secs == 0 {
            errors.push("battery.poll_interval_secs: must be greater than 0".to_string());
        }
        if self.battery.animation_interval_ms == 0 {
            errors.push("battery.animation_interval_ms: must be greater than 0".to_string());
        }
        if self.battery.blink_interval_ms == 0 {
            errors.push("battery.blink_interval_ms: must be greater than 0".to_string());
        }

        if self.temperature.thermal_zone.as_os_str().is_empty() {
            errors.push("temperature.thermal_zone: must not be empty".to_string());
        }
        if self.temperature.state_file.as_os_str().is_empty() {
            errors.push("temperature.state_file: must not be empty".to_string());
        }

        if self.system.cpu_sample_ms == 0 {
            errors.push("system.cpu_sample_ms: must be greater than 0".to_string());
        }
        for (name, thresholds) in [
            ("cpu", &self.system.cpu),
            ("ram", &self.system.ram),
            ("gpu", &self.system.gpu),
        ] {
            if thresholds.warn > thresholds.crit {
                errors.push(format!(
                    "system.{}: warn ({}) must not exceed crit ({})",
                    name, thresholds.warn, thresholds.crit
                ));
            }
        }

        if self.bluetooth.scan_cache.as_os_str().is_empty() {
            errors.push("bluetooth.scan_cache: must not be empty".to_string());
        }
        if self.bluetooth.scan_duration_secs == 0 {
            errors.push("bluetooth.scan_duration_secs: must be greater than 0".to_string());
        }

        if self.menu.program.trim().is_empty() {
            errors.push("menu.program: must not be empty".to_string());
        }

        if self.cava.config_path.trim().is_empty() {
            errors.push("cava.config_path: must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigValidation(errors))
        }
    }

    /// Human-readable summary of the configuration.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push("Battery:".to_string());
        lines.push(format!(
            "  device: {} (adapter: {})",
            self.battery.device, self.battery.adapter
        ));
        lines.push(format!(
            "  poll: {}s, animation: {}ms, blink: {}ms",
            self.battery.poll_interval_secs,
            self.battery.animation_interval_ms,
            self.battery.blink_interval_ms
        ));

        lines.push("\nTemperature:".to_string());
        lines.push(format!(
            "  thermal_zone: {}",
            self.temperature.thermal_zone.display()
        ));
        lines.push(format!(
            "  state_file: {}",
            self.temperature.state_file.display()
        ));

        lines.push("\nSystem:".to_string());
        lines.push(format!("  cpu_sample_ms: {}", self.system.cpu_sample_ms));
        lines.push(format!(
            "  cpu: {}/{}, ram: {}/{}, gpu: {}/{}",
            self.system.cpu.warn,
            self.system.cpu.crit,
            self.system.ram.warn,
            self.system.ram.crit,
            self.system.gpu.warn,
            self.system.gpu.crit
        ));

        lines.push("\nBluetooth:".to_string());
        lines.push(format!(
            "  scan_cache: {} ({}s scans)",
            self.bluetooth.scan_cache.display(),
            self.bluetooth.scan_duration_secs
        ));

        lines.push("\nMenu:".to_string());
        lines.push(format!("  program: {}", self.menu.program));

        lines.push("\nCava:".to_string());
        lines.push(format!(
            "  config_path: {}",
            self.cava.resolved_config_path().display()
        ));

        lines.join("\n")
    }
}

/// Deep merge two TOML tables, with `overlay` values taking precedence.
///
/// For nested tables, recursively merges. For arrays and other values,
/// the overlay value completely replaces the base value.
fn deep_merge_toml(base: &mut Table, overlay: Table) {
    for (key, overlay_value) in overlay {
        match (base.get_mut(&key), overlay_value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge_toml(base_table, overlay_table);
            }
            (_, overlay_value) => {
                base.insert(key, overlay_value);
            }
        }
    }
}

/// Root of the kernel's power supply class.
pub const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

/// Battery renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Battery directory name under `/sys/class/power_supply`.
    pub device: String,

    /// AC adapter directory name under `/sys/class/power_supply`.
    pub adapter: String,

    /// Fallback sysfs poll interval in seconds.
    pub poll_interval_secs: u32,

    /// Charging animation frame interval in milliseconds.
    pub animation_interval_ms: u64,

    /// Critical blink interval in milliseconds.
    pub blink_interval_ms: u64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            device: "BAT0".to_string(),
            adapter: "AC0".to_string(),
            poll_interval_secs: 2,
            animation_interval_ms: 750,
            blink_interval_ms: 500,
        }
    }
}

impl BatteryConfig {
    /// Sysfs directory of the battery.
    pub fn device_dir(&self) -> PathBuf {
        Path::new(POWER_SUPPLY_PATH).join(&self.device)
    }

    /// Sysfs directory of the AC adapter.
    pub fn adapter_dir(&self) -> PathBuf {
        Path::new(POWER_SUPPLY_PATH).join(&self.adapter)
    }

    /// UPower object path for this battery.
    pub fn upower_path(&self) -> String {
        format!("/org/freedesktop/UPower/devices/battery_{}", self.device)
    }
}

/// Temperature renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemperatureConfig {
    /// Thermal zone file reporting millidegrees Celsius.
    pub thermal_zone: PathBuf,

    /// Marker file; text is shown while it exists.
    pub state_file: PathBuf,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            thermal_zone: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
            state_file: PathBuf::from("/tmp/polybar_temp_state"),
        }
    }
}

/// Warning/critical percentage thresholds. A reading at or above a threshold
/// takes that level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    pub warn: f64,
    pub crit: f64,
}

impl Thresholds {
    pub const fn new(warn: f64, crit: f64) -> Self {
        Self { warn, crit }
    }
}

/// System monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    /// Gap between the two `/proc/stat` samples in milliseconds.
    pub cpu_sample_ms: u64,
    pub cpu: Thresholds,
    pub ram: Thresholds,
    pub gpu: Thresholds,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            cpu_sample_ms: 500,
            cpu: Thresholds::new(60.0, 75.0),
            ram: Thresholds::new(55.0, 75.0),
            gpu: Thresholds::new(60.0, 75.0),
        }
    }
}

/// Bluetooth menu configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BluetoothConfig {
    /// Dump of `bluetoothctl devices` taken right after the last scan.
    pub scan_cache: PathBuf,

    /// How long discovery runs when "scan" is chosen.
    pub scan_duration_secs: u32,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            scan_cache: PathBuf::from("/tmp/bt_scan_cache"),
            scan_duration_secs: 3,
        }
    }
}

/// Default rofi theme override shared by both menus.
pub const DEFAULT_MENU_THEME: &str = r#"window { width: 800px; } listview { lines: 12; } element-text { font: "JetBrainsMono Nerd Font Mono 11"; }"#;

/// Menu front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuConfig {
    /// Launcher binary run in dmenu mode.
    pub program: String,

    /// Passed through `-theme-str`.
    pub theme: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            program: "rofi".to_string(),
            theme: DEFAULT_MENU_THEME.to_string(),
        }
    }
}

/// Cava input switcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CavaConfig {
    /// Cava config file. A leading `~/` is expanded from `$HOME`.
    pub config_path: String,

    /// Delay before resolving the default sink after an event.
    pub settle_ms: u64,
}

impl Default for CavaConfig {
    fn default() -> Self {
        Self {
            config_path: "~/.config/cava/config".to_string(),
            settle_ms: 500,
        }
    }
}

impl CavaConfig {
    /// `config_path` with `~/` expanded.
    pub fn resolved_config_path(&self) -> PathBuf {
        expand_home(&self.config_path, env::var("HOME").ok().as_deref())
    }
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
