//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use timew_sync::application::{parse_command, CommandParseError, OutputFormat};
use timew_sync::domain::CommandRequest;

/// timew-sync - live, race-free control of Timewarrior.
///
/// One-shot commands poll the tool, apply the command and print the
/// refreshed state. `watch` keeps the engine running, prints every event
/// and accepts textual commands on stdin.
#[derive(Parser, Debug)]
#[command(name = "timew-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: text or json.
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,

    /// Configuration file (defaults to ~/.timew-sync/config.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll once and show the current timer.
    Status,

    /// Start a timer with the given tags.
    Start {
        /// Tags for the new session.
        tags: Vec<String>,
    },

    /// Stop the running timer.
    Stop,

    /// Stop the running timer, or start one with the most recent tags.
    Toggle,

    /// Replace the running timer's tags, keeping its start time.
    Retag {
        /// New tags for the running session.
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Run a textual command, e.g. `send startTimer work client-a`.
    Send {
        /// Command name followed by its tags.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },

    /// Keep syncing, print events, and read commands from stdin.
    ///
    /// Besides the timer commands, stdin accepts `status`, `refresh`,
    /// `history` and `quit`.
    Watch,

    /// Write the default configuration file if missing and print its path.
    Config,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

/// One line read from stdin during `watch`.
#[derive(Debug, PartialEq, Eq)]
pub enum WatchInput {
    Blank,
    Quit,
    Status,
    Refresh,
    History,
    Command(CommandRequest),
    Invalid(CommandParseError),
}

impl WatchInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            "quit" | "exit" => Self::Quit,
            "status" => Self::Status,
            "refresh" => Self::Refresh,
            "history" => Self::History,
            command => match parse_command(command) {
                Ok(request) => Self::Command(request),
                Err(e) => Self::Invalid(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_keeps_words() {
        let cli = Cli::parse_from(["timew-sync", "send", "startTimer", "work", "client-a"]);
        match cli.command {
            Commands::Send { line } => assert_eq!(line, vec!["startTimer", "work", "client-a"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_global_format_after_subcommand() {
        let cli = Cli::parse_from(["timew-sync", "status", "--format", "json"]);
        assert_eq!(cli.output_format(), Ok(OutputFormat::Json));
    }

    #[test]
    fn test_history_is_a_watch_input_not_a_subcommand() {
        assert!(Cli::try_parse_from(["timew-sync", "history"]).is_err());
        assert_eq!(WatchInput::parse(" history\n"), WatchInput::History);
    }

    #[test]
    fn test_watch_input() {
        assert_eq!(WatchInput::parse("   "), WatchInput::Blank);
        assert_eq!(WatchInput::parse("exit"), WatchInput::Quit);
        assert_eq!(WatchInput::parse("refresh"), WatchInput::Refresh);
        assert_eq!(
            WatchInput::parse("startTimer deep-work"),
            WatchInput::Command(CommandRequest::start_timer(vec!["deep-work".into()]))
        );
        assert!(matches!(
            WatchInput::parse("pause"),
            WatchInput::Invalid(CommandParseError::Unknown { .. })
        ));
    }
}
