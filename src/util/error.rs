use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write to sysfs path: {0}")]
    WriteError(String),

    #[error("Failed to read sysfs path: {0}")]
    ReadError(String),

    #[error("Control action not supported: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}. Try running with sudo.")]
    PermissionDenied(String),

    #[error("Invalid governor: {0}")]
    InvalidGovernor(String),

    #[error("Failed to parse value: {0}")]
    ParseError(String),

    #[error("Path missing: {0}")]
    PathMissing(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SysMonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read sysfs path: {0}")]
    ReadError(String),

    #[error("Failed to parse value: {0}")]
    ParseError(String),

    #[error("Failed to parse /proc/stat: {0}")]
    ProcStatParseError(String),
}

// A unified error type for the entire application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Control(#[from] ControlError),

    #[error("{0}")]
    Monitor(#[from] SysMonitorError),

    #[error("{0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    /// Whether the root cause is a permission problem on a control file.
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Control(ControlError::PermissionDenied(_)))
    }
}
