//! Application layer - the sync engine and the pieces it drives.
//!
//! This layer contains the polling/command orchestration, the export
//! parser, the tag history, event fan-out and output formatting.

pub mod command;
pub mod events;
pub mod formatter;
pub mod parser;
pub mod sync_engine;
pub mod tag_history;

pub use command::{parse_command, CommandParseError};
pub use events::{EventPublisher, EventSubscription};
pub use formatter::{
    format_event, format_history_table, format_json, format_outcome, format_status,
    OutputFormat,
};
pub use sync_engine::SyncEngine;
pub use tag_history::TagHistory;
