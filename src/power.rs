use crate::monitor::{Result, read_sysfs_file_trimmed, read_sysfs_value};
use log::{debug, warn};
use std::{
    cell::Cell,
    fs,
    path::{Path, PathBuf},
};

// Supply types that can run the machine without draining the battery
const MAINS_TYPES: &[&str] = &[
    "Mains", "USB_PD_DRP", "USB_PD", "USB_DCP", "USB_CDP", "USB_ACA",
];

// Name prefixes used by AC adapters that lack a `type` attribute
const AC_NAME_PREFIXES: &[&str] = &["AC", "ACAD", "ADP"];

/// Live probes that pick the controller state each iteration
pub trait PowerProbe {
    /// Whether the pause marker exists. Presence only, contents are never read.
    fn is_locked(&self) -> bool;

    /// Whether the machine runs on external power
    fn is_plugged(&self) -> Result<bool>;
}

/// Probes backed by `/sys/class/power_supply` and a marker file
pub struct SysfsPowerProbe {
    power_supply_root: PathBuf,
    ac_adapter: String,
    lock_file: PathBuf,
    warned_no_mains: Cell<bool>,
}

impl SysfsPowerProbe {
    pub fn new(
        power_supply_root: impl Into<PathBuf>,
        ac_adapter: impl Into<String>,
        lock_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            power_supply_root: power_supply_root.into(),
            ac_adapter: ac_adapter.into(),
            lock_file: lock_file.into(),
            warned_no_mains: Cell::new(false),
        }
    }

    /// Scan every supply for an online mains adapter.
    ///
    /// `None` when the system has no mains-type supply at all.
    fn scan_mains_supplies(&self) -> Result<Option<bool>> {
        let Ok(entries) = fs::read_dir(&self.power_supply_root) else {
            return Ok(None);
        };

        let mut found_mains = false;
        for entry in entries.flatten() {
            let ps_path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if !is_mains_supply(&ps_path, &name) {
                continue;
            }
            let online_path = ps_path.join("online");
            if !online_path.exists() {
                continue;
            }

            found_mains = true;
            if read_sysfs_value::<u8>(&online_path)? != 0 {
                debug!("Power supply '{name}' is online");
                return Ok(Some(true));
            }
        }

        Ok(found_mains.then_some(false))
    }
}

fn is_mains_supply(ps_path: &Path, name: &str) -> bool {
    match read_sysfs_file_trimmed(ps_path.join("type")) {
        Ok(ps_type) => MAINS_TYPES.contains(&ps_type.as_str()),
        // fallback for type file missing
        Err(_) => AC_NAME_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix)),
    }
}

impl PowerProbe for SysfsPowerProbe {
    fn is_locked(&self) -> bool {
        self.lock_file.exists()
    }

    fn is_plugged(&self) -> Result<bool> {
        let online_path = self.power_supply_root.join(&self.ac_adapter).join("online");
        if online_path.exists() {
            return Ok(read_sysfs_value::<u8>(&online_path)? != 0);
        }

        if let Some(plugged) = self.scan_mains_supplies()? {
            return Ok(plugged);
        }

        // Nothing to save battery for without a power adapter
        if !self.warned_no_mains.replace(true) {
            warn!(
                "No AC adapter found under {} (expected '{}'). Assuming AC power.",
                self.power_supply_root.display(),
                self.ac_adapter
            );
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SysfsTree;
    use crate::util::error::SysMonitorError;

    fn probe_for(tree: &SysfsTree) -> SysfsPowerProbe {
        SysfsPowerProbe::new(tree.power_root(), "ADP1", tree.lock_file())
    }

    #[test]
    fn test_lock_file_presence() {
        let tree = SysfsTree::new(1);
        let probe = probe_for(&tree);
        assert!(!probe.is_locked());

        // empty marker is enough
        fs::write(tree.lock_file(), "").unwrap();
        assert!(probe.is_locked());
    }

    #[test]
    fn test_configured_adapter() {
        let tree = SysfsTree::new(1);
        tree.add_supply("ADP1", Some("Mains"), Some("1"));
        let probe = probe_for(&tree);
        assert!(probe.is_plugged().unwrap());

        tree.add_supply("ADP1", Some("Mains"), Some("0"));
        assert!(!probe.is_plugged().unwrap());
    }

    #[test]
    fn test_differently_named_adapter_is_discovered() {
        let tree = SysfsTree::new(1);
        tree.add_supply("BAT0", Some("Battery"), None);
        tree.add_supply("ACAD", None, Some("1"));
        let probe = probe_for(&tree);
        assert!(probe.is_plugged().unwrap());
    }

    #[test]
    fn test_usb_pd_supply_counts_as_mains() {
        let tree = SysfsTree::new(1);
        tree.add_supply("BAT0", Some("Battery"), None);
        tree.add_supply("ucsi-source-psy-1", Some("USB_PD"), Some("0"));
        let probe = probe_for(&tree);
        assert!(!probe.is_plugged().unwrap());
    }

    #[test]
    fn test_no_mains_supply_assumes_ac() {
        let tree = SysfsTree::new(1);
        tree.add_supply("BAT0", Some("Battery"), None);
        let probe = probe_for(&tree);
        assert!(!probe.warned_no_mains.get());

        assert!(probe.is_plugged().unwrap());
        assert!(probe.warned_no_mains.get());

        // later iterations stay quiet and keep assuming AC
        assert!(probe.is_plugged().unwrap());
        assert!(probe.warned_no_mains.get());
    }

    #[test]
    fn test_garbage_online_value_is_fatal() {
        let tree = SysfsTree::new(1);
        tree.add_supply("ADP1", Some("Mains"), Some("yes"));
        let probe = probe_for(&tree);
        assert!(matches!(
            probe.is_plugged(),
            Err(SysMonitorError::ParseError(_))
        ));
    }
}
