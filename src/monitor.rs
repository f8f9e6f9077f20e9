use crate::util::error::SysMonitorError;
use log::debug;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    thread,
    time::Duration,
};

pub type Result<T, E = SysMonitorError> = std::result::Result<T, E>;

// Read a sysfs file to a string, trimming whitespace
pub(crate) fn read_sysfs_file_trimmed(path: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(path.as_ref())
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            SysMonitorError::ReadError(format!("Path: {:?}, Error: {}", path.as_ref().display(), e))
        })
}

// Read a sysfs file and parse it to a specific type
pub(crate) fn read_sysfs_value<T: FromStr>(path: impl AsRef<Path>) -> Result<T> {
    let content = read_sysfs_file_trimmed(path.as_ref())?;
    content.parse::<T>().map_err(|_| {
        SysMonitorError::ParseError(format!(
            "Could not parse '{}' from {:?}",
            content,
            path.as_ref().display()
        ))
    })
}

/// Produces one utilization percentage per core, measured over a blocking window.
pub trait UtilizationSampler {
    /// Block for `interval` and return `0.0..=100.0` per core, indexed by core id.
    fn sample(&mut self, interval: Duration) -> Result<Vec<f32>>;
}

/// Jiffy counters of one `cpuN` line in /proc/stat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    // guest time is already folded into user/nice by the kernel
    pub const fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    pub const fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy percentage between two samples, rounded to one decimal
    pub fn usage_since(&self, prev: &Self) -> f32 {
        let total_delta = self.total().saturating_sub(prev.total());
        if total_delta == 0 {
            return 0.0;
        }
        let idle_delta = self.idle_total().saturating_sub(prev.idle_total());
        let busy_delta = total_delta.saturating_sub(idle_delta);

        let percent = busy_delta as f64 / total_delta as f64 * 100.0;
        ((percent * 10.0).round() / 10.0) as f32
    }
}

fn parse_cpu_line(line: &str) -> Result<CpuTimes> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    // cpuN user nice system idle at minimum
    if fields.len() < 5 {
        return Err(SysMonitorError::ProcStatParseError(format!(
            "expected at least 5 fields, got {} in '{line}'",
            fields.len()
        )));
    }

    let field = |idx: usize| -> Result<u64> {
        match fields.get(idx) {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| {
                SysMonitorError::ProcStatParseError(format!("invalid counter '{raw}' in '{line}'"))
            }),
        }
    };

    Ok(CpuTimes {
        user: field(1)?,
        nice: field(2)?,
        system: field(3)?,
        idle: field(4)?,
        iowait: field(5)?,
        irq: field(6)?,
        softirq: field(7)?,
        steal: field(8)?,
    })
}

/// Per-core counters keyed by core id. The aggregate `cpu` line is skipped.
pub fn parse_per_core_times(content: &str) -> Result<BTreeMap<u32, CpuTimes>> {
    let mut cores = BTreeMap::new();
    for line in content.lines() {
        let Some(label) = line.split_whitespace().next() else {
            continue;
        };
        let Some(id) = label.strip_prefix("cpu") else {
            continue;
        };
        if let Ok(core_id) = id.parse::<u32>() {
            cores.insert(core_id, parse_cpu_line(line)?);
        }
    }

    if cores.is_empty() {
        return Err(SysMonitorError::ProcStatParseError(
            "no per-core cpu lines found".to_string(),
        ));
    }
    Ok(cores)
}

/// Per-core usage between two snapshots. Cores missing from either snapshot
/// (offline) read as idle.
pub fn compute_usage(
    prev: &BTreeMap<u32, CpuTimes>,
    curr: &BTreeMap<u32, CpuTimes>,
    core_count: u32,
) -> Vec<f32> {
    (0..core_count)
        .map(|core_id| match (prev.get(&core_id), curr.get(&core_id)) {
            (Some(before), Some(after)) => after.usage_since(before),
            _ => 0.0,
        })
        .collect()
}

/// Samples per-core utilization from /proc/stat deltas
pub struct ProcStatSampler {
    stat_path: PathBuf,
    core_count: u32,
}

impl ProcStatSampler {
    pub fn new(core_count: u32) -> Self {
        Self::with_path("/proc/stat", core_count)
    }

    pub fn with_path(stat_path: impl Into<PathBuf>, core_count: u32) -> Self {
        Self {
            stat_path: stat_path.into(),
            core_count,
        }
    }

    fn snapshot(&self) -> Result<BTreeMap<u32, CpuTimes>> {
        let content = fs::read_to_string(&self.stat_path)?;
        parse_per_core_times(&content)
    }
}

impl UtilizationSampler for ProcStatSampler {
    fn sample(&mut self, interval: Duration) -> Result<Vec<f32>> {
        let before = self.snapshot()?;
        thread::sleep(interval);
        let after = self.snapshot()?;

        let usage = compute_usage(&before, &after, self.core_count);
        debug!("Sampled utilization over {}s: {usage:?}", interval.as_secs());
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STAT_BEFORE: &str = "\
cpu  400 0 200 1400 0 0 0 0 0 0
cpu0 100 0 50 850 0 0 0 0 0 0
cpu1 300 0 150 550 0 0 0 0 0 0
intr 12345 0 0
ctxt 987654
";

    const STAT_AFTER: &str = "\
cpu  1410 0 300 1690 0 0 0 0 0 0
cpu0 1050 0 50 900 0 0 0 0 0 0
cpu1 360 0 250 790 0 0 0 0 0 0
intr 12400 0 0
ctxt 987700
";

    #[test]
    fn test_parse_skips_aggregate_and_non_cpu_lines() {
        let cores = parse_per_core_times(STAT_BEFORE).unwrap();
        assert_eq!(cores.len(), 2);
        assert_eq!(cores[&0].user, 100);
        assert_eq!(cores[&1].idle, 550);
    }

    #[test]
    fn test_usage_from_deltas() {
        let before = parse_per_core_times(STAT_BEFORE).unwrap();
        let after = parse_per_core_times(STAT_AFTER).unwrap();

        // cpu0: 950 busy of 1000, cpu1: 160 busy of 400
        assert_eq!(compute_usage(&before, &after, 2), vec![95.0, 40.0]);
    }

    #[test]
    fn test_offline_core_reads_idle() {
        let before = parse_per_core_times(STAT_BEFORE).unwrap();
        let after = parse_per_core_times(STAT_AFTER).unwrap();

        let usage = compute_usage(&before, &after, 4);
        assert_eq!(usage.len(), 4);
        assert_eq!(usage[2], 0.0);
        assert_eq!(usage[3], 0.0);
    }

    #[test]
    fn test_zero_elapsed_time() {
        let times = CpuTimes {
            user: 10,
            idle: 10,
            ..CpuTimes::default()
        };
        assert_eq!(times.usage_since(&times), 0.0);
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            parse_per_core_times("cpu0 1 2\n"),
            Err(SysMonitorError::ProcStatParseError(_))
        ));
        assert!(matches!(
            parse_per_core_times("cpu0 1 2 x 4\n"),
            Err(SysMonitorError::ProcStatParseError(_))
        ));
        assert!(parse_per_core_times("intr 1 2 3\n").is_err());
    }

    #[test]
    fn test_sampler_reads_stat_file() {
        let dir = TempDir::new().unwrap();
        let stat = dir.path().join("stat");
        fs::write(&stat, STAT_BEFORE).unwrap();

        // same file on both reads means nothing ran in between
        let mut sampler = ProcStatSampler::with_path(&stat, 2);
        assert_eq!(sampler.sample(Duration::ZERO).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sampler_missing_stat_file() {
        let dir = TempDir::new().unwrap();
        let mut sampler = ProcStatSampler::with_path(dir.path().join("stat"), 2);
        assert!(matches!(
            sampler.sample(Duration::ZERO),
            Err(SysMonitorError::Io(_))
        ));
    }
}
