use crate::config::AppConfig;
use crate::conflict::{self, ConflictDetection};
use crate::cpu::{FrequencyStore, REFERENCE_CORE, SysfsStore};
use crate::power::{PowerProbe, SysfsPowerProbe};
use crate::util::error::AppError;
use std::io::{self, Write};

fn ghz(freq_khz: u64) -> String {
    format!("{:.2} GHz", freq_khz as f64 / 1e6)
}

/// Print a read-only snapshot of the frequency controls and power state
pub fn run_info(config: &AppConfig) -> Result<(), AppError> {
    let store = SysfsStore::open(&config.controller.cpu_sysfs_root)?;
    let probe = SysfsPowerProbe::new(
        &config.controller.power_supply_root,
        config.controller.ac_adapter.clone(),
        &config.controller.lock_file,
    );

    let mut stdout = io::stdout().lock();
    write_report(&mut stdout, &store, &probe, &conflict::detect_conflicts())?;
    writeln!(
        stdout,
        "Controls Writable: {}",
        if store.controls_writable() { "yes" } else { "no (run as root)" }
    )?;
    Ok(())
}

/// Write the report. Unreadable attributes show as N/A instead of failing.
pub fn write_report<W, S, P>(
    out: &mut W,
    store: &S,
    probe: &P,
    conflicts: &ConflictDetection,
) -> io::Result<()>
where
    W: Write,
    S: FrequencyStore,
    P: PowerProbe,
{
    writeln!(out, "--- CPU ---")?;
    writeln!(out, "Logical Cores: {}", store.core_count())?;
    writeln!(
        out,
        "Frequency Range: {}",
        store.bounds().map_or_else(
            |_| "N/A".to_string(),
            |b| format!("{} - {}", ghz(b.min_khz), ghz(b.max_khz))
        )
    )?;
    writeln!(
        out,
        "Available Frequencies: {}",
        store.available_frequencies().map_or_else(
            |_| "N/A".to_string(),
            |freqs| freqs.into_iter().map(ghz).collect::<Vec<_>>().join(", ")
        )
    )?;
    writeln!(
        out,
        "Available Governors: {}",
        store
            .available_governors()
            .map_or_else(|_| "N/A".to_string(), |govs| govs.join(", "))
    )?;
    writeln!(
        out,
        "Current Governor: {}",
        store
            .governor(REFERENCE_CORE)
            .unwrap_or_else(|_| "N/A".to_string())
    )?;

    writeln!(out, "\n--- CORES ---")?;
    for core_id in 0..store.core_count() {
        writeln!(
            out,
            "Core {core_id}: {}",
            store
                .current_frequency(core_id)
                .map_or_else(|_| "N/A".to_string(), ghz)
        )?;
    }

    writeln!(out, "\n--- POWER ---")?;
    writeln!(
        out,
        "Power Source: {}",
        probe.is_plugged().map_or_else(
            |e| format!("N/A ({e})"),
            |plugged| String::from(if plugged { "AC" } else { "Battery" })
        )
    )?;
    writeln!(
        out,
        "Paused: {}",
        if probe.is_locked() { "yes" } else { "no" }
    )?;

    writeln!(out, "\n--- CONFLICTS ---")?;
    writeln!(out, "{}", conflicts.get_conflict_message())?;
    Ok(())
}
