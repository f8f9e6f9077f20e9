use crate::config::{ControllerConfig, PolicyConfig};
use crate::core::{ChangeSymbol, ControllerState, FrequencyBounds};
use crate::monitor;
use crate::power::PowerProbe;

/// One `scaling_setspeed` write decided by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyWrite {
    pub target_khz: u64,
    pub symbol: Option<ChangeSymbol>,
}

/// Pick this iteration's state. The power probe is only consulted when unlocked.
pub fn determine_state<P: PowerProbe>(probe: &P) -> monitor::Result<ControllerState> {
    if probe.is_locked() {
        return Ok(ControllerState::Locked);
    }
    if probe.is_plugged()? {
        Ok(ControllerState::Plugged)
    } else {
        Ok(ControllerState::OnBattery)
    }
}

/// Governor the state requires, if any
pub fn target_governor(state: ControllerState, config: &ControllerConfig) -> Option<&str> {
    match state {
        ControllerState::Locked => None,
        ControllerState::Plugged => Some(config.performance_governor.as_str()),
        ControllerState::OnBattery => Some(config.manual_governor.as_str()),
    }
}

/// `Some(target)` only when a write is actually needed
pub fn governor_change<'a>(target: &'a str, current: &str) -> Option<&'a str> {
    (current.trim() != target).then_some(target)
}

/// Frequency writes for one core, in the order they must be issued.
///
/// The raising bands are evaluated first, then the lowering bands, both
/// relative to `current_khz`. With the default thresholds at most one write
/// results. Custom thresholds can make both match, in which case the lowering
/// write comes last and wins.
pub fn plan_adjustments(
    usage_percent: f32,
    current_khz: u64,
    bounds: FrequencyBounds,
    step_khz: u64,
    policy: &PolicyConfig,
) -> Vec<FrequencyWrite> {
    let mut writes = Vec::with_capacity(1);

    if usage_percent > policy.steep_up_above {
        let delta = step_khz.saturating_mul(policy.steep_up_steps);
        writes.push(raise(current_khz, delta, bounds, ChangeSymbol::SteepUp));
    } else if usage_percent > policy.up_above {
        writes.push(raise(current_khz, step_khz, bounds, ChangeSymbol::Up));
    }

    if usage_percent < policy.steep_down_below {
        let delta = step_khz.saturating_mul(policy.steep_down_steps);
        writes.push(lower(current_khz, delta, bounds, ChangeSymbol::SteepDown));
    } else if usage_percent < policy.down_below {
        writes.push(lower(current_khz, step_khz, bounds, ChangeSymbol::Down));
    }

    writes
}

/// Symbol shown for a core: the latest one carried by any write.
///
/// A write pinned to the minimum carries none, so it leaves an earlier symbol in place.
pub fn reported_symbol(writes: &[FrequencyWrite]) -> Option<ChangeSymbol> {
    writes.iter().rev().find_map(|write| write.symbol)
}

fn raise(
    current_khz: u64,
    delta_khz: u64,
    bounds: FrequencyBounds,
    symbol: ChangeSymbol,
) -> FrequencyWrite {
    let candidate = current_khz.saturating_add(delta_khz);
    if candidate < bounds.max_khz {
        FrequencyWrite {
            target_khz: bounds.clamp(candidate),
            symbol: Some(symbol),
        }
    } else {
        FrequencyWrite {
            target_khz: bounds.max_khz,
            symbol: Some(ChangeSymbol::PinnedMax),
        }
    }
}

fn lower(
    current_khz: u64,
    delta_khz: u64,
    bounds: FrequencyBounds,
    symbol: ChangeSymbol,
) -> FrequencyWrite {
    let candidate = current_khz.saturating_sub(delta_khz);
    if candidate > bounds.min_khz {
        FrequencyWrite {
            target_khz: bounds.clamp(candidate),
            symbol: Some(symbol),
        }
    } else {
        // pinned at the floor, nothing to show
        FrequencyWrite {
            target_khz: bounds.min_khz,
            symbol: None,
        }
    }
}
