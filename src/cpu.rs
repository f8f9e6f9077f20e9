use crate::core::FrequencyBounds;
use crate::util::error::ControlError;
use crate::util::sysfs::{path_exists_and_writable, read_sysfs_value, write_sysfs_value};
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

pub type Result<T, E = ControlError> = std::result::Result<T, E>;

pub const SCALING_GOVERNOR: &str = "scaling_governor";
pub const SCALING_SETSPEED: &str = "scaling_setspeed";
pub const SCALING_CUR_FREQ: &str = "scaling_cur_freq";
pub const SCALING_MIN_FREQ: &str = "scaling_min_freq";
pub const SCALING_MAX_FREQ: &str = "scaling_max_freq";
pub const SCALING_AVAILABLE_FREQUENCIES: &str = "scaling_available_frequencies";
pub const SCALING_AVAILABLE_GOVERNORS: &str = "scaling_available_governors";

/// Core whose tables and bounds stand in for every core
pub const REFERENCE_CORE: u32 = 0;

/// Per-core cpufreq attributes, addressed by core index and attribute name.
///
/// Implementors only provide raw attribute access and the core count. The
/// typed accessors are built on top of those. Errors are never retried.
pub trait FrequencyStore {
    fn read_attribute(&self, core_id: u32, key: &str) -> Result<String>;

    fn write_attribute(&mut self, core_id: u32, key: &str, value: &str) -> Result<()>;

    /// Number of logical cores, fixed for the process lifetime
    fn core_count(&self) -> u32;

    /// Frequency table of the reference core, sorted ascending
    fn available_frequencies(&self) -> Result<Vec<u64>> {
        let content = self.read_attribute(REFERENCE_CORE, SCALING_AVAILABLE_FREQUENCIES)?;
        let mut frequencies = content
            .split_whitespace()
            .map(|token| parse_value::<u64>(token, SCALING_AVAILABLE_FREQUENCIES))
            .collect::<Result<Vec<_>>>()?;
        frequencies.sort_unstable();
        Ok(frequencies)
    }

    fn available_governors(&self) -> Result<Vec<String>> {
        let content = self.read_attribute(REFERENCE_CORE, SCALING_AVAILABLE_GOVERNORS)?;
        Ok(content.split_whitespace().map(String::from).collect())
    }

    fn bounds(&self) -> Result<FrequencyBounds> {
        let min_khz = parse_value(
            &self.read_attribute(REFERENCE_CORE, SCALING_MIN_FREQ)?,
            SCALING_MIN_FREQ,
        )?;
        let max_khz = parse_value(
            &self.read_attribute(REFERENCE_CORE, SCALING_MAX_FREQ)?,
            SCALING_MAX_FREQ,
        )?;
        Ok(FrequencyBounds { min_khz, max_khz })
    }

    fn governor(&self, core_id: u32) -> Result<String> {
        self.read_attribute(core_id, SCALING_GOVERNOR)
    }

    fn current_frequency(&self, core_id: u32) -> Result<u64> {
        parse_value(
            &self.read_attribute(core_id, SCALING_CUR_FREQ)?,
            SCALING_CUR_FREQ,
        )
    }

    /// Request a frequency. Only honoured while the manual governor is active.
    fn set_frequency(&mut self, core_id: u32, freq_khz: u64) -> Result<()> {
        self.write_attribute(core_id, SCALING_SETSPEED, &freq_khz.to_string())
    }

    /// Set the same governor on every core, in core order.
    ///
    /// A failure part-way leaves earlier cores switched.
    fn set_governor(&mut self, governor: &str) -> Result<()> {
        for core_id in 0..self.core_count() {
            self.write_attribute(core_id, SCALING_GOVERNOR, governor)?;
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        ControlError::ParseError(format!("Could not parse '{}' from {key}", raw.trim()))
    })
}

/// Fail unless `governor` is one the kernel offers
pub fn ensure_governor_available(governor: &str, available: &[String]) -> Result<()> {
    if available.iter().any(|g| g == governor) {
        Ok(())
    } else {
        Err(ControlError::InvalidGovernor(format!(
            "Governor '{}' is not available on this system. Valid governors: {}",
            governor,
            available.join(", ")
        )))
    }
}

/// `FrequencyStore` backed by the cpufreq sysfs tree
#[derive(Debug, Clone)]
pub struct SysfsStore {
    root: PathBuf,
    core_count: u32,
}

impl SysfsStore {
    /// Open the store rooted at `root` (normally `/sys/devices/system/cpu`).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let core_count = get_logical_core_count(&root)?;
        debug!("Found {core_count} logical cores under {}", root.display());
        Ok(Self { root, core_count })
    }

    fn attribute_path(&self, core_id: u32, key: &str) -> PathBuf {
        self.root.join(format!("cpu{core_id}/cpufreq/{key}"))
    }

    /// Whether the governor control of the reference core accepts writes
    pub fn controls_writable(&self) -> bool {
        path_exists_and_writable(&self.attribute_path(REFERENCE_CORE, SCALING_GOVERNOR))
    }
}

impl FrequencyStore for SysfsStore {
    fn read_attribute(&self, core_id: u32, key: &str) -> Result<String> {
        read_sysfs_value(self.attribute_path(core_id, key))
    }

    fn write_attribute(&mut self, core_id: u32, key: &str, value: &str) -> Result<()> {
        debug!("cpu{core_id}: writing '{value}' to {key}");
        write_sysfs_value(self.attribute_path(core_id, key), value)
    }

    fn core_count(&self) -> u32 {
        self.core_count
    }
}

/// Count online `cpuN` entries under `root`, falling back to the OS count when none are found.
///
/// Offline cores (e.g. SMT siblings under `nosmt`) have no cpufreq directory, so they are skipped.
pub fn get_logical_core_count(root: &Path) -> Result<u32> {
    if !root.exists() {
        return Err(ControlError::NotSupported(format!(
            "No logical cores found at {}.",
            root.display()
        )));
    }

    let entries = fs::read_dir(root)
        .map_err(|_| {
            ControlError::PermissionDenied(format!("Cannot read contents of {}.", root.display()))
        })?
        .flatten();

    let mut num_cores: u32 = 0;
    for entry in entries {
        let entry_file_name = entry.file_name();
        let Some(name) = entry_file_name.to_str() else {
            continue;
        };

        // Skip non-CPU directories (e.g., cpuidle, cpufreq)
        let Some(index) = name.strip_prefix("cpu") else {
            continue;
        };
        if !index.is_empty()
            && index.chars().all(|c| c.is_ascii_digit())
            && is_core_online(&entry.path())
        {
            num_cores += 1;
        }
    }

    if num_cores == 0 {
        num_cores = num_cpus::get() as u32;
    }

    Ok(num_cores)
}

// cpu0 usually has no `online` attribute and cannot be offlined
fn is_core_online(core_path: &Path) -> bool {
    fs::read_to_string(core_path.join("online")).map_or(true, |s| s.trim() != "0")
}
