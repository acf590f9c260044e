//! Configuration consumed by the sync engine and the tool adapter.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Engine cadence and bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between the end of one poll and the start of the next.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-invocation timeout for the external tool.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Maximum number of remembered tag-sets.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Per-subscriber event buffer; the oldest events are dropped on overflow.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            history_capacity: default_history_capacity(),
            event_buffer: default_event_buffer(),
        }
    }
}

const fn default_poll_interval_ms() -> u64 {
    2_000
}

const fn default_command_timeout_ms() -> u64 {
    5_000
}

const fn default_history_capacity() -> usize {
    100
}

const fn default_event_buffer() -> usize {
    64
}

impl EngineConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    /// Returns `AppError::Config` naming the first zero-valued option.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("poll_interval_ms", self.poll_interval_ms == 0),
            ("command_timeout_ms", self.command_timeout_ms == 0),
            ("history_capacity", self.history_capacity == 0),
            ("event_buffer", self.event_buffer == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(AppError::Config {
                message: format!("engine.{name} must be greater than zero"),
            }),
            None => Ok(()),
        }
    }
}

/// How the external tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Program name or path.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments that export the current session as JSON.
    #[serde(default = "default_export_args")]
    pub export_args: Vec<String>,

    /// Interval reference passed to `retag`.
    #[serde(default = "default_retag_target")]
    pub retag_target: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            export_args: default_export_args(),
            retag_target: default_retag_target(),
        }
    }
}

fn default_program() -> String {
    "timew".into()
}

fn default_export_args() -> Vec<String> {
    vec!["export".into(), ":day".into()]
}

fn default_retag_target() -> String {
    "@1".into()
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub tool: ToolConfig,
}

impl AppConfig {
    /// Directory holding `config.toml`.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".timew-sync")
    }

    /// Validate every section.
    ///
    /// # Errors
    /// Returns `AppError::Config` on the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.tool.program.trim().is_empty() {
            return Err(AppError::Config {
                message: "tool.program must not be empty".into(),
            });
        }
        if self.tool.export_args.is_empty() {
            return Err(AppError::Config {
                message: "tool.export_args must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.engine.history_capacity, 100);
        assert_eq!(config.tool.program, "timew");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [engine]
            poll_interval_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.poll_interval_ms, 500);
        assert_eq!(config.engine.command_timeout_ms, 5_000);
        assert_eq!(config.tool.export_args, vec!["export", ":day"]);
    }

    #[test]
    fn test_unknown_sections_ignored() {
        let config: AppConfig = toml::from_str("[paths]\ndata_dir = \"/tmp/x\"\n").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.engine.history_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history_capacity"));
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = AppConfig::default();
        config.tool.program = "  ".into();
        assert!(config.validate().is_err());
    }
}
