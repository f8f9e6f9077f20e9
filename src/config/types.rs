// Configuration types and structures for clockhead
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        self.policy.validate()
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Idle sleep when locked or plugged, and the utilization sampling window
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,
    /// Frequency adjustment unit in kHz
    #[serde(default = "default_step_khz")]
    pub step_khz: u64,
    /// The controller pauses while this file exists
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
    #[serde(default = "default_cpu_sysfs_root")]
    pub cpu_sysfs_root: String,
    #[serde(default = "default_power_supply_root")]
    pub power_supply_root: String,
    /// Name of the AC adapter under `power_supply_root`
    #[serde(default = "default_ac_adapter")]
    pub ac_adapter: String,
    #[serde(default = "default_performance_governor")]
    pub performance_governor: String,
    #[serde(default = "default_manual_governor")]
    pub manual_governor: String,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl ControllerConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_sec)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_sec == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_sec must be greater than 0".to_string(),
            ));
        }
        if self.step_khz == 0 {
            return Err(ConfigError::ValidationError(
                "step_khz must be greater than 0".to_string(),
            ));
        }
        if self.performance_governor.trim().is_empty() || self.manual_governor.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "governor names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_sec: default_poll_interval_sec(),
            step_khz: default_step_khz(),
            lock_file: default_lock_file(),
            cpu_sysfs_root: default_cpu_sysfs_root(),
            power_supply_root: default_power_supply_root(),
            ac_adapter: default_ac_adapter(),
            performance_governor: default_performance_governor(),
            manual_governor: default_manual_governor(),
            log_level: default_log_level(),
        }
    }
}

/// Utilization bands (percent) and step multipliers for the frequency policy.
///
/// Raising bands are checked first, then lowering bands. When custom values
/// make both match, the lowering write lands last.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    #[serde(default = "default_steep_up_above")]
    pub steep_up_above: f32,
    #[serde(default = "default_up_above")]
    pub up_above: f32,
    #[serde(default = "default_steep_down_below")]
    pub steep_down_below: f32,
    #[serde(default = "default_down_below")]
    pub down_below: f32,
    #[serde(default = "default_steep_up_steps")]
    pub steep_up_steps: u64,
    #[serde(default = "default_steep_down_steps")]
    pub steep_down_steps: u64,
}

impl PolicyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("steep_up_above", self.steep_up_above),
            ("up_above", self.up_above),
            ("steep_down_below", self.steep_down_below),
            ("down_below", self.down_below),
        ];
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} ({value}) must be between 0% and 100%"
                )));
            }
        }

        if self.steep_up_above < self.up_above {
            return Err(ConfigError::ValidationError(format!(
                "steep_up_above ({}) cannot be lower than up_above ({})",
                self.steep_up_above, self.up_above
            )));
        }
        if self.steep_down_below > self.down_below {
            return Err(ConfigError::ValidationError(format!(
                "steep_down_below ({}) cannot be higher than down_below ({})",
                self.steep_down_below, self.down_below
            )));
        }
        if self.steep_up_steps == 0 || self.steep_down_steps == 0 {
            return Err(ConfigError::ValidationError(
                "step multipliers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            steep_up_above: default_steep_up_above(),
            up_above: default_up_above(),
            steep_down_below: default_steep_down_below(),
            down_below: default_down_below(),
            steep_up_steps: default_steep_up_steps(),
            steep_down_steps: default_steep_down_steps(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warning => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
        }
    }
}

// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(toml::de::Error),
    ValidationError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlError(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "I/O error: {e}"),
            Self::TomlError(e) => write!(f, "TOML parsing error: {e}"),
            Self::ValidationError(s) => write!(f, "Configuration validation error: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

const fn default_poll_interval_sec() -> u64 {
    3
}

const fn default_step_khz() -> u64 {
    300_000
}

fn default_lock_file() -> String {
    "/tmp/clockhead.lock".to_string()
}

fn default_cpu_sysfs_root() -> String {
    "/sys/devices/system/cpu".to_string()
}

fn default_power_supply_root() -> String {
    "/sys/class/power_supply".to_string()
}

fn default_ac_adapter() -> String {
    "ADP1".to_string()
}

fn default_performance_governor() -> String {
    "performance".to_string()
}

fn default_manual_governor() -> String {
    "userspace".to_string()
}

const fn default_log_level() -> LogLevel {
    LogLevel::Info
}

const fn default_steep_up_above() -> f32 {
    90.0
}

const fn default_up_above() -> f32 {
    50.0
}

const fn default_steep_down_below() -> f32 {
    3.0
}

const fn default_down_below() -> f32 {
    10.0
}

const fn default_steep_up_steps() -> u64 {
    3
}

const fn default_steep_down_steps() -> u64 {
    2
}
