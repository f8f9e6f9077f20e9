use std::process::{Command, Stdio};

/// Services that rewrite governors or frequencies behind our back
const KNOWN_SERVICES: &[(&str, &str)] = &[
    ("tlp.service", "switches governors on power-source changes"),
    (
        "power-profiles-daemon.service",
        "overrides governors and energy preferences",
    ),
    ("tuned.service", "applies its own cpufreq profiles"),
    ("auto-cpufreq.service", "manages governors and frequencies"),
    ("thermald.service", "caps frequencies under thermal pressure"),
    ("cpupower.service", "sets a governor at boot"),
];

/// Power-management services found running alongside clockhead
#[derive(Debug, Default)]
pub struct ConflictDetection {
    /// (unit name, what it does to cpufreq)
    pub active: Vec<(&'static str, &'static str)>,
}

impl ConflictDetection {
    pub fn has_conflicts(&self) -> bool {
        !self.active.is_empty()
    }

    /// Get formatted conflict information
    pub fn get_conflict_message(&self) -> String {
        if !self.has_conflicts() {
            return "No conflicts detected with other power management services.".to_string();
        }

        let mut message =
            "Other services may write to cpufreq while clockhead is running:\n".to_string();
        for (service, effect) in &self.active {
            message.push_str(&format!("- {service} is active and {effect}.\n"));
        }
        message.push_str("Stop them for clockhead to be the only writer.");

        message
    }
}

/// Detect if systemctl is available
fn systemctl_exists() -> bool {
    Command::new("sh")
        .arg("-c")
        .arg("command -v systemctl")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Check if a specific systemd service is active.
fn is_service_active(service: &str) -> bool {
    Command::new("systemctl")
        .arg("--quiet")
        .arg("is-active")
        .arg(service)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Check for other cpufreq writers. Without systemd nothing is reported.
pub fn detect_conflicts() -> ConflictDetection {
    if !systemctl_exists() {
        return ConflictDetection::default();
    }

    ConflictDetection {
        active: KNOWN_SERVICES
            .iter()
            .copied()
            .filter(|(service, _)| is_service_active(service))
            .collect(),
    }
}
