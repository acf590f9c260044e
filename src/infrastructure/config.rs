//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# timew-sync configuration
# Auto-generated - edit as needed

[engine]
# Delay between the end of one poll and the start of the next (ms)
poll_interval_ms = 2000

# Timeout for a single invocation of the time tracking tool (ms)
command_timeout_ms = 5000

# Number of remembered tag-sets
history_capacity = 100

# Events buffered per subscriber before the oldest are dropped
event_buffer = 64

[tool]
# Program to invoke
program = "timew"

# Arguments that export the current session as JSON
export_args = ["export", ":day"]

# Interval passed to `retag`
retag_target = "@1"
"#;

/// Load configuration from the default location, or defaults if absent.
///
/// # Errors
/// Returns error if file exists but cannot be read, parsed or validated.
pub fn load_config() -> Result<AppConfig> {
    let config_path = config_file_path();

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read, parsed or validated.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "Configuration loaded");

    Ok(config)
}

/// Write the commented default configuration if no file exists yet.
///
/// Returns the path of the configuration file.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %path.display(), "Created default configuration");
    }

    Ok(path.to_path_buf())
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    AppConfig::default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_config_path_is_in_data_dir() {
        let path = config_file_path();
        assert_eq!(path.parent(), Some(AppConfig::default_data_dir().as_path()));
        assert!(!DEFAULT_CONFIG.contains("data_dir"));
    }

    #[test]
    fn test_ensure_then_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        ensure_config_exists(&config_path).unwrap();
        let loaded = load_config_from_file(&config_path).unwrap();

        assert_eq!(loaded.engine.poll_interval_ms, 2000);
        assert_eq!(loaded.engine.history_capacity, 100);
    }

    #[test]
    fn test_ensure_keeps_existing_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[engine]\npoll_interval_ms = 750\n").unwrap();

        ensure_config_exists(&config_path).unwrap();
        let loaded = load_config_from_file(&config_path).unwrap();

        assert_eq!(loaded.engine.poll_interval_ms, 750);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[engine]\ncommand_timeout_ms = 0\n").unwrap();

        let err = load_config_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("command_timeout_ms"));
    }
}
