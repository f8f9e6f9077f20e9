//! Fakes and fixtures shared by the unit tests.

use crate::cpu::{
    FrequencyStore, Result, SCALING_AVAILABLE_FREQUENCIES, SCALING_AVAILABLE_GOVERNORS,
    SCALING_CUR_FREQ, SCALING_GOVERNOR, SCALING_MAX_FREQ, SCALING_MIN_FREQ, SCALING_SETSPEED,
};
use crate::monitor::UtilizationSampler;
use crate::power::PowerProbe;
use crate::util::error::{ControlError, SysMonitorError};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Throwaway directory laid out like `/sys/devices/system/cpu` and
/// `/sys/class/power_supply`
pub struct SysfsTree {
    dir: TempDir,
}

impl SysfsTree {
    /// `cores` cores on `powersave` at 1.0 GHz, range 0.8 - 2.0 GHz
    pub fn new(cores: u32) -> Self {
        let tree = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(tree.power_root()).unwrap();

        for core_id in 0..cores {
            fs::create_dir_all(tree.cpu_root().join(format!("cpu{core_id}/cpufreq"))).unwrap();
            tree.write(core_id, SCALING_GOVERNOR, "powersave\n");
            tree.write(core_id, SCALING_CUR_FREQ, "1000000\n");
            tree.write(core_id, SCALING_SETSPEED, "<unsupported>\n");
            tree.write(core_id, SCALING_MIN_FREQ, "800000\n");
            tree.write(core_id, SCALING_MAX_FREQ, "2000000\n");
            tree.write(core_id, SCALING_AVAILABLE_FREQUENCIES, "2000000 1400000 800000 \n");
            tree.write(
                core_id,
                SCALING_AVAILABLE_GOVERNORS,
                "performance powersave userspace \n",
            );
        }
        tree
    }

    pub fn cpu_root(&self) -> PathBuf {
        self.dir.path().join("cpu")
    }

    pub fn power_root(&self) -> PathBuf {
        self.dir.path().join("power_supply")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.dir.path().join("clockhead.lock")
    }

    pub fn read(&self, core_id: u32, key: &str) -> String {
        fs::read_to_string(self.cpu_root().join(format!("cpu{core_id}/cpufreq/{key}")))
            .unwrap()
            .trim()
            .to_string()
    }

    pub fn write(&self, core_id: u32, key: &str, value: &str) {
        fs::write(
            self.cpu_root().join(format!("cpu{core_id}/cpufreq/{key}")),
            value,
        )
        .unwrap();
    }

    /// Simulate an offlined core losing its cpufreq directory
    pub fn remove_cpufreq(&self, core_id: u32) {
        fs::remove_dir_all(self.cpu_root().join(format!("cpu{core_id}/cpufreq"))).unwrap();
    }

    pub fn add_supply(&self, name: &str, ps_type: Option<&str>, online: Option<&str>) {
        let path = self.power_root().join(name);
        fs::create_dir_all(&path).unwrap();
        if let Some(ps_type) = ps_type {
            fs::write(path.join("type"), format!("{ps_type}\n")).unwrap();
        }
        if let Some(online) = online {
            fs::write(path.join("online"), format!("{online}\n")).unwrap();
        }
    }
}

/// In-memory store that records every write.
///
/// Writing `scaling_setspeed` moves `scaling_cur_freq`, snapped to the
/// frequency table when one is set.
pub struct FakeStore {
    attributes: HashMap<(u32, String), String>,
    core_count: u32,
    table: Option<Vec<u64>>,
    failing_core: Option<u32>,
    pub writes: Vec<(u32, String, String)>,
}

impl FakeStore {
    pub fn new(core_count: u32, min_khz: u64, max_khz: u64) -> Self {
        let mut store = Self {
            attributes: HashMap::new(),
            core_count,
            table: None,
            failing_core: None,
            writes: Vec::new(),
        };
        store.put(0, SCALING_MIN_FREQ, &min_khz.to_string());
        store.put(0, SCALING_MAX_FREQ, &max_khz.to_string());
        store.put(0, SCALING_AVAILABLE_FREQUENCIES, &format!("{max_khz} {min_khz}"));
        store.put(
            0,
            SCALING_AVAILABLE_GOVERNORS,
            "performance powersave userspace",
        );
        for core_id in 0..core_count {
            store.put(core_id, SCALING_GOVERNOR, "powersave");
            store.put(core_id, SCALING_CUR_FREQ, &min_khz.to_string());
        }
        store
    }

    /// Snap requested frequencies to the nearest entry, like the kernel does
    pub fn with_frequency_table(mut self, table: &[u64]) -> Self {
        self.table = Some(table.to_vec());
        self
    }

    pub fn put(&mut self, core_id: u32, key: &str, value: &str) {
        self.attributes
            .insert((core_id, key.to_string()), value.to_string());
    }

    pub fn set_current(&mut self, core_id: u32, freq_khz: u64) {
        self.put(core_id, SCALING_CUR_FREQ, &freq_khz.to_string());
    }

    pub fn set_all_governors(&mut self, governor: &str) {
        for core_id in 0..self.core_count {
            self.put(core_id, SCALING_GOVERNOR, governor);
        }
    }

    /// Every write to `core_id` fails with `PermissionDenied`
    pub fn fail_writes_on(&mut self, core_id: u32) {
        self.failing_core = Some(core_id);
    }

    pub fn writes_to(&self, key: &str) -> Vec<(u32, String)> {
        self.writes
            .iter()
            .filter(|(_, k, _)| k == key)
            .map(|(core_id, _, value)| (*core_id, value.clone()))
            .collect()
    }

    fn snap(&self, requested: u64) -> u64 {
        match &self.table {
            Some(table) => table
                .iter()
                .copied()
                .min_by_key(|freq| freq.abs_diff(requested))
                .unwrap_or(requested),
            None => requested,
        }
    }
}

impl FrequencyStore for FakeStore {
    fn read_attribute(&self, core_id: u32, key: &str) -> Result<String> {
        self.attributes
            .get(&(core_id, key.to_string()))
            .cloned()
            .ok_or_else(|| ControlError::PathMissing(format!("cpu{core_id}/cpufreq/{key}")))
    }

    fn write_attribute(&mut self, core_id: u32, key: &str, value: &str) -> Result<()> {
        if self.failing_core == Some(core_id) {
            return Err(ControlError::PermissionDenied(format!(
                "cpu{core_id}/cpufreq/{key}"
            )));
        }

        self.writes
            .push((core_id, key.to_string(), value.to_string()));
        if key == SCALING_SETSPEED {
            let requested: u64 = value.parse().unwrap();
            let actual = self.snap(requested);
            self.set_current(core_id, actual);
        } else {
            self.put(core_id, key, value);
        }
        Ok(())
    }

    fn core_count(&self) -> u32 {
        self.core_count
    }
}

/// Probe with fixed answers that counts power reads
pub struct ScriptedProbe {
    locked: bool,
    plugged: bool,
    plugged_reads: Cell<u32>,
}

impl ScriptedProbe {
    pub fn new(locked: bool, plugged: bool) -> Self {
        Self {
            locked,
            plugged,
            plugged_reads: Cell::new(0),
        }
    }

    pub fn plugged_reads(&self) -> u32 {
        self.plugged_reads.get()
    }
}

impl PowerProbe for ScriptedProbe {
    fn is_locked(&self) -> bool {
        self.locked
    }

    fn is_plugged(&self) -> crate::monitor::Result<bool> {
        self.plugged_reads.set(self.plugged_reads.get() + 1);
        Ok(self.plugged)
    }
}

/// Sampler that replays canned readings and never sleeps
#[derive(Default)]
pub struct ScriptedSampler {
    readings: VecDeque<Vec<f32>>,
    pub calls: u32,
}

impl ScriptedSampler {
    pub fn new(readings: Vec<Vec<f32>>) -> Self {
        Self {
            readings: readings.into(),
            calls: 0,
        }
    }
}

impl UtilizationSampler for ScriptedSampler {
    fn sample(&mut self, _interval: Duration) -> crate::monitor::Result<Vec<f32>> {
        self.calls += 1;
        self.readings
            .pop_front()
            .ok_or_else(|| SysMonitorError::ReadError("no more scripted readings".to_string()))
    }
}
