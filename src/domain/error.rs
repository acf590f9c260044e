//! Error types for timew-sync.
//!
//! `RunError` and `ParseError` stay inside the engine; collaborators only
//! ever see `ErrorKind`. `AppError` covers the front-end (config, CLI).

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Process-level failure while invoking the external tool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The program is missing from the execution environment.
    #[error("Program not found: {program}")]
    NotFound { program: String },

    /// The process did not finish in time and was killed.
    #[error("Timed out after {}ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },

    /// The process exited with a failure status.
    #[error("Exited with code {}: {}", .exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()), .stderr.trim())]
    NonZeroExit {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Empty argument list or zero timeout.
    #[error("Invalid invocation: {reason}")]
    InvalidInvocation { reason: String },

    /// Spawning or talking to the process failed.
    #[error("IO error: {message}")]
    Io { message: String },
}

/// The tool's output could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed export: {detail}")]
    Malformed { detail: String },
}

impl ParseError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}

/// User-facing error taxonomy, carried by command outcomes and events.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("A timer is already running")]
    AlreadyActive,

    #[error("No timer is running")]
    NotActive,

    #[error("Invalid tag: {tag:?}")]
    InvalidTag { tag: String },

    #[error("Time tracking tool is not available")]
    ExternalToolUnavailable,

    #[error("Command failed: {detail}")]
    CommandFailed { detail: String },

    #[error("Service is shutting down")]
    ShuttingDown,
}

impl From<RunError> for ErrorKind {
    fn from(err: RunError) -> Self {
        match err {
            RunError::NotFound { .. } => Self::ExternalToolUnavailable,
            other => Self::CommandFailed {
                detail: other.to_string(),
            },
        }
    }
}

impl From<ParseError> for ErrorKind {
    fn from(err: ParseError) -> Self {
        Self::CommandFailed {
            detail: err.to_string(),
        }
    }
}

/// Front-end errors (configuration, IO, rejected commands).
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration file missing, unreadable or invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A timer command was rejected or failed.
    #[error(transparent)]
    Command(#[from] ErrorKind),

    /// Output serialization failed.
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl AppError {
    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a JSON error.
    pub fn json(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_unavailable() {
        let kind = ErrorKind::from(RunError::NotFound {
            program: "timew".into(),
        });
        assert_eq!(kind, ErrorKind::ExternalToolUnavailable);
    }

    #[test]
    fn test_timeout_maps_to_command_failed() {
        let kind = ErrorKind::from(RunError::TimedOut {
            timeout: Duration::from_millis(250),
        });
        match kind {
            ErrorKind::CommandFailed { detail } => assert!(detail.contains("250ms")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = RunError::NonZeroExit {
            exit_code: Some(255),
            stderr: "There is no active time tracking.\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "Exited with code 255: There is no active time tracking."
        );
    }

    #[test]
    fn test_error_kind_serializes_tagged() {
        let json = serde_json::to_string(&ErrorKind::NotActive).unwrap();
        assert_eq!(json, r#"{"kind":"not_active"}"#);
    }
}
