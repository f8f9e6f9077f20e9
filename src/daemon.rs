use crate::config::AppConfig;
use crate::conflict;
use crate::core::{ControllerState, CoreSummary, FrequencyBounds};
use crate::cpu::{FrequencyStore, REFERENCE_CORE, SysfsStore, ensure_governor_available};
use crate::engine;
use crate::monitor::{ProcStatSampler, UtilizationSampler};
use crate::power::{PowerProbe, SysfsPowerProbe};
use crate::util::error::AppError;
use log::{debug, info, warn};
use std::thread;

/// Outcome of one pass through the control loop
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub state: ControllerState,
    /// One entry per core, only filled on battery
    pub summaries: Vec<CoreSummary>,
}

/// The frequency controller: probes, decides, then writes.
///
/// The store, probes and sampler are injected so the loop can run against
/// in-memory fakes.
pub struct Controller<S, P, U> {
    store: S,
    probe: P,
    sampler: U,
    config: AppConfig,
    bounds: FrequencyBounds,
}

impl<S, P, U> Controller<S, P, U>
where
    S: FrequencyStore,
    P: PowerProbe,
    U: UtilizationSampler,
{
    /// Read and cache the startup tables, checking both governors exist.
    pub fn new(store: S, probe: P, sampler: U, config: AppConfig) -> Result<Self, AppError> {
        let governors = store.available_governors()?;
        ensure_governor_available(&config.controller.performance_governor, &governors)?;
        ensure_governor_available(&config.controller.manual_governor, &governors)?;

        let frequencies = store.available_frequencies()?;
        let bounds = store.bounds()?;

        info!(
            "Controlling {} cores between {:.2} and {:.2} GHz in steps of {} kHz",
            store.core_count(),
            bounds.min_khz as f64 / 1e6,
            bounds.max_khz as f64 / 1e6,
            config.controller.step_khz
        );
        debug!("Available frequencies: {frequencies:?}");
        debug!("Available governors: {}", governors.join(", "));

        Ok(Self {
            store,
            probe,
            sampler,
            config,
            bounds,
        })
    }

    /// Run one iteration without the idle sleep.
    ///
    /// On battery this blocks for the sampling window instead.
    pub fn tick(&mut self) -> Result<Iteration, AppError> {
        let state = engine::determine_state(&self.probe)?;

        if let Some(target) = engine::target_governor(state, &self.config.controller) {
            let current = self.store.governor(REFERENCE_CORE)?;
            if let Some(governor) = engine::governor_change(target, &current) {
                info!("Switching governor from '{current}' to '{governor}'");
                self.store.set_governor(governor)?;
            }
        }

        let summaries = match state {
            ControllerState::OnBattery => self.adjust_frequencies()?,
            ControllerState::Locked | ControllerState::Plugged => Vec::new(),
        };

        Ok(Iteration { state, summaries })
    }

    fn adjust_frequencies(&mut self) -> Result<Vec<CoreSummary>, AppError> {
        let usage = self
            .sampler
            .sample(self.config.controller.poll_interval())?;

        let mut summaries = Vec::with_capacity(usage.len());
        for (core_id, usage_percent) in (0u32..).zip(usage) {
            let current_khz = self.store.current_frequency(core_id)?;
            if !self.bounds.contains(current_khz) {
                debug!("cpu{core_id}: {current_khz} kHz is outside the cached bounds");
            }
            let writes = engine::plan_adjustments(
                usage_percent,
                current_khz,
                self.bounds,
                self.config.controller.step_khz,
                &self.config.policy,
            );
            for write in &writes {
                self.store.set_frequency(core_id, write.target_khz)?;
            }

            // the kernel may round to a neighbouring table entry
            let frequency_khz = self.store.current_frequency(core_id)?;
            summaries.push(CoreSummary {
                core_id,
                usage_percent,
                frequency_khz,
                change: engine::reported_symbol(&writes),
            });
        }

        Ok(summaries)
    }

    /// Loop forever. Only an error ends it.
    pub fn run(&mut self) -> Result<(), AppError> {
        let interval = self.config.controller.poll_interval();
        loop {
            let iteration = self.tick()?;
            match iteration.state.status_line() {
                Some(status) => {
                    println!("{status}");
                    debug!("Sleeping for {}s until next cycle", interval.as_secs());
                    thread::sleep(interval);
                }
                None => {
                    for summary in &iteration.summaries {
                        println!("{summary}");
                    }
                    println!();
                }
            }
        }
    }

    #[cfg(test)]
    pub const fn bounds(&self) -> FrequencyBounds {
        self.bounds
    }

    #[cfg(test)]
    pub fn parts(&self) -> (&S, &P, &U) {
        (&self.store, &self.probe, &self.sampler)
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

/// Run the daemon against the real sysfs tree
pub fn run_daemon(config: AppConfig) -> Result<(), AppError> {
    info!("Starting clockhead daemon...");

    let conflicts = conflict::detect_conflicts();
    if conflicts.has_conflicts() {
        for line in conflicts.get_conflict_message().lines() {
            warn!("{line}");
        }
    }

    let store = SysfsStore::open(&config.controller.cpu_sysfs_root)?;
    if !store.controls_writable() {
        warn!("cpufreq controls do not look writable; the first write will likely fail");
    }

    let probe = SysfsPowerProbe::new(
        &config.controller.power_supply_root,
        config.controller.ac_adapter.clone(),
        &config.controller.lock_file,
    );
    let sampler = ProcStatSampler::new(store.core_count());

    info!(
        "Polling every {}s, pause marker: {}",
        config.controller.poll_interval_sec, config.controller.lock_file
    );

    Controller::new(store, probe, sampler, config)?.run()
}
