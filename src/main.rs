//! timew-sync - keeps a live view of Timewarrior and serializes commands.
//!
//! The sync engine polls `timew export`, diffs the parsed state, and
//! publishes changes; start/stop/retag commands are queued through the same
//! single task so they never race the poller or each other.
//!
//!   timew-sync status                 # Poll once and show the timer
//!   timew-sync start work client-a    # Start tracking with tags
//!   timew-sync toggle                 # Stop, or restart with the last tags
//!   timew-sync watch --format json    # Stream events, read commands on stdin

mod cli;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use timew_sync::application::{
    format_event, format_history_table, format_json, format_outcome, format_status,
    parse_command, OutputFormat, SyncEngine,
};
use timew_sync::domain::{self, AppConfig, AppError, CommandOutcome, EngineStatus};
use timew_sync::infrastructure::{self, ProcessRunner, TimewProfile};

use cli::{Cli, Commands, WatchInput};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;

    if matches!(cli.command, Commands::Config) {
        return cmd_config(cli.config.as_deref());
    }

    let config = match cli.config.as_deref() {
        Some(path) => infrastructure::load_config_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => infrastructure::load_config().context("loading default configuration")?,
    };

    let engine = spawn_engine(&config);

    let result = match cli.command {
        Commands::Status => cmd_status(&engine, format).await,
        Commands::Start { tags } => report(engine.start_timer(tags).await, format),
        Commands::Stop => report(engine.stop_timer().await, format),
        Commands::Toggle => report(engine.start_or_stop().await, format),
        Commands::Retag { tags } => report(engine.edit_tags(tags).await, format),
        Commands::Send { line } => {
            let request = parse_command(&line.join(" "))?;
            report(engine.submit(request).await, format)
        }
        Commands::Watch => cmd_watch(&engine, format).await,
        Commands::Config => Ok(()),
    };

    engine.shutdown().await;
    result
}

/// Start the engine against the configured program.
fn spawn_engine(config: &AppConfig) -> SyncEngine {
    let runner = ProcessRunner::new(config.tool.program.clone());
    tracing::debug!(program = runner.program(), "Using time tracking tool");
    SyncEngine::spawn(
        config.engine.clone(),
        TimewProfile::new(&config.tool),
        runner,
    )
}

/// Show status after the first poll.
async fn cmd_status(engine: &SyncEngine, format: OutputFormat) -> anyhow::Result<()> {
    let status = engine.wait_until_initialized().await;
    print_status(&status, format)?;
    Ok(())
}

fn print_status(status: &EngineStatus, format: OutputFormat) -> domain::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", format_status(status)),
        OutputFormat::Json => println!("{}", format_json(status).map_err(AppError::json)?),
    }
    Ok(())
}

/// Print a command outcome; a failed command fails the process.
fn report(outcome: CommandOutcome, format: OutputFormat) -> anyhow::Result<()> {
    print_outcome(&outcome, format)?;

    match outcome.error {
        Some(error) => Err(AppError::Command(error).into()),
        None => Ok(()),
    }
}

fn print_outcome(outcome: &CommandOutcome, format: OutputFormat) -> domain::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", format_outcome(outcome)),
        OutputFormat::Json => println!("{}", format_json(outcome).map_err(AppError::json)?),
    }
    Ok(())
}

/// Stream events and serve stdin commands until Ctrl-C or `quit`.
async fn cmd_watch(engine: &SyncEngine, format: OutputFormat) -> anyhow::Result<()> {
    let mut events = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!("Watching; send commands on stdin");

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Received Ctrl-C, shutting down");
                break;
            }
            event = events.next() => {
                let Some(event) = event else { break };
                match format {
                    OutputFormat::Text => println!("{}", format_event(&event)),
                    OutputFormat::Json => println!("{}", format_json(&event).map_err(AppError::json)?),
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !serve_line(engine, &line, format).await? {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin, ignoring further input");
                    stdin_open = false;
                }
            }
        }
    }

    Ok(())
}

/// Handle one stdin line. Returns `false` when the watcher should stop.
async fn serve_line(engine: &SyncEngine, line: &str, format: OutputFormat) -> domain::Result<bool> {
    match WatchInput::parse(line) {
        WatchInput::Blank => {}
        WatchInput::Quit => return Ok(false),
        WatchInput::Status => print_status(&engine.status(), format)?,
        WatchInput::Refresh => print_status(&engine.refresh().await, format)?,
        WatchInput::History => {
            let history = engine.tag_history();
            match format {
                OutputFormat::Text => println!("{}", format_history_table(&history)),
                OutputFormat::Json => println!("{}", format_json(&history).map_err(AppError::json)?),
            }
        }
        WatchInput::Command(request) => print_outcome(&engine.submit(request).await, format)?,
        WatchInput::Invalid(e) => eprintln!("{} {}", "✗".red().bold(), e),
    }
    Ok(true)
}

/// Create the configuration file if needed and print where it lives.
fn cmd_config(path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let path = path.map_or_else(infrastructure::config_file_path, std::path::Path::to_path_buf);
    let written = infrastructure::ensure_config_exists(&path)?;
    println!("{} {}", "Config:".bold(), written.display());
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so JSON on stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
