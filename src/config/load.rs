// Configuration loading functionality
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::types::{AppConfig, ConfigError};

/// Load configuration, either from an explicit path or from the standard locations.
///
/// An explicit path must exist and parse. Discovered files that fail to load
/// are reported and skipped, falling back to defaults.
///
/// Runs before the logger is set up, so diagnostics go straight to stderr.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit_path {
        return load_config_from_path(path);
    }

    for path in config_search_paths() {
        if !path.exists() {
            continue;
        }
        match load_config_from_path(&path) {
            Ok(config) => {
                eprintln!("Loaded config from: {}", path.display());
                return Ok(config);
            }
            Err(e) => {
                eprintln!("Error loading config file {}: {e}", path.display());
            }
        }
    }

    Ok(AppConfig::default())
}

/// Read, parse and validate a single config file
pub fn load_config_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut config_paths: Vec<PathBuf> = Vec::new();

    // User-specific path
    if let Some(config_dir) = dirs::config_dir() {
        config_paths.push(config_dir.join("clockhead/config.toml"));
    } else {
        eprintln!(
            "Warning: Could not determine config directory. User-specific config will not be loaded."
        );
    }

    // System-wide path
    config_paths.push(PathBuf::from("/etc/clockhead/config.toml"));

    config_paths
}
