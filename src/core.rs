use std::fmt;

/// Frequency range shared by every core, in kHz as reported by cpufreq.
///
/// Read once from the reference core at startup. All cores are assumed to
/// share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyBounds {
    pub min_khz: u64,
    pub max_khz: u64,
}

impl FrequencyBounds {
    pub const fn clamp(&self, freq_khz: u64) -> u64 {
        if freq_khz < self.min_khz {
            self.min_khz
        } else if freq_khz > self.max_khz {
            self.max_khz
        } else {
            freq_khz
        }
    }

    pub const fn contains(&self, freq_khz: u64) -> bool {
        self.min_khz <= freq_khz && freq_khz <= self.max_khz
    }
}

/// Console indicator for a frequency change on one core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSymbol {
    SteepUp,
    Up,
    PinnedMax,
    SteepDown,
    Down,
}

impl fmt::Display for ChangeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let glyph = match self {
            Self::SteepUp => "⬆️  ⬆️ ",
            Self::Up => "⬆️ ",
            Self::PinnedMax => "🔥",
            Self::SteepDown => "⬇️ ⬇️",
            Self::Down => "⬇️",
        };
        f.write_str(glyph)
    }
}

/// Per-core result of one battery-mode iteration. Printed, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSummary {
    pub core_id: u32,
    pub usage_percent: f32,
    pub frequency_khz: u64,
    pub change: Option<ChangeSymbol>,
}

impl fmt::Display for CoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:\t{:.1}%, {:.2}GHz",
            self.core_id,
            self.usage_percent,
            self.frequency_khz as f64 / 1e6
        )?;
        if let Some(change) = self.change {
            write!(f, " {change}")?;
        }
        Ok(())
    }
}

/// Which branch of the control loop an iteration takes.
/// Recomputed from live probes at the top of every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Locked,
    Plugged,
    OnBattery,
}

impl ControllerState {
    /// Line printed for states that idle instead of adjusting frequencies
    pub const fn status_line(self) -> Option<&'static str> {
        match self {
            Self::Locked => Some("Locked. Waiting ..."),
            Self::Plugged => Some("Plugged. Waiting ..."),
            Self::OnBattery => None,
        }
    }
}
