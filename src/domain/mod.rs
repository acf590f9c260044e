//! Domain layer - timer state, commands, events and error types.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (processes, IO, etc.).

pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, EngineConfig, ToolConfig};
pub use error::{AppError, ErrorKind, ParseError, Result, RunError};
pub use models::{
    dedup_tags, CommandKind, CommandOutcome, CommandRequest, EngineStatus, Event,
    TagHistoryEntry, TimerState,
};
