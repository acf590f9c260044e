//! Infrastructure layer - external adapters (subprocesses, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod command_runner;
pub mod config;
pub mod timew;

pub use command_runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use config::{config_file_path, ensure_config_exists, load_config, load_config_from_file};
pub use timew::TimewProfile;
