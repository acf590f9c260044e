//! Output formatting for engine snapshots, outcomes and events.
//!
//! Supports a colored text view and JSON.

use chrono::{Duration, Local};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::domain::{CommandOutcome, EngineStatus, Event, TagHistoryEntry, TimerState};

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored text.
    #[default]
    Text,
    /// JSON for programmatic use (status bars, scripts).
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: text, json")),
        }
    }
}

/// Serialize any snapshot as a single JSON line.
///
/// # Errors
/// Returns the serializer error if `value` cannot be encoded.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Formats a duration as `1h 05m 03s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{minutes}m {seconds:02}s")
    }
}

fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "(untagged)".dimmed().to_string()
    } else {
        tags.join(" ").cyan().to_string()
    }
}

/// Formats a timer snapshot on one line.
pub fn format_timer(state: &TimerState) -> String {
    match (state.started_at(), state.elapsed()) {
        (Some(started), Some(elapsed)) => {
            let mut line = format!(
                "{} {} {} since {}",
                "▶".green().bold(),
                format_tags(state.tags()),
                format_duration(elapsed).bold(),
                started.with_timezone(&Local).format("%H:%M")
            );
            if let Some(annotation) = state.annotation() {
                line.push_str(&format!(" \"{annotation}\""));
            }
            line
        }
        _ => format!("{} {}", "■".dimmed(), "No active timer".dimmed()),
    }
}

/// Formats the engine status, flagging stale data when degraded.
pub fn format_status(status: &EngineStatus) -> String {
    match status {
        EngineStatus::Uninitialized => "Waiting for first poll...".yellow().to_string(),
        EngineStatus::Synced { state } => format_timer(state),
        EngineStatus::Degraded { last_known, reason } => {
            let header = format!("{} {}", "⚠ Degraded:".yellow().bold(), reason);
            match last_known {
                Some(state) => format!("{header}\n  last known: {}", format_timer(state)),
                None => header,
            }
        }
    }
}

/// Formats the result of a command.
pub fn format_outcome(outcome: &CommandOutcome) -> String {
    match (&outcome.error, &outcome.resulting_state) {
        (Some(error), _) => format!("{} {}", "✗".red().bold(), error),
        (None, Some(state)) => format!("{} {}", "✓".green().bold(), format_timer(state)),
        (None, None) => format!(
            "{} {}",
            "✓".green().bold(),
            "Applied, state not yet refreshed".yellow()
        ),
    }
}

/// Formats one event for a log-style stream.
pub fn format_event(event: &Event) -> String {
    let stamp = Local::now().format("%H:%M:%S").to_string().dimmed();
    let body = match event {
        Event::StateChanged(state) => format_timer(state),
        Event::TagsHistoryUpdated => "Tag history updated".blue().to_string(),
        Event::CommandFailed(error) => format!("{} {}", "Command failed:".red(), error),
        Event::Degraded(reason) => format!("{} {}", "⚠ Degraded:".yellow().bold(), reason),
        Event::Recovered => "Recovered".green().to_string(),
    };
    format!("{stamp} {body}")
}

/// Formats the tag history as a table, most recent first.
pub fn format_history_table(entries: &[TagHistoryEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Tags", "Last used"]);

    for (i, entry) in entries.iter().enumerate() {
        let last_used = entry
            .last_used_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(vec![
            &(i + 1).to_string(),
            &truncate(&entry.raw_tags.join(" "), 50),
            &last_used,
        ]);
    }

    table.to_string()
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::domain::ErrorKind;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world!", 8), "hello...");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(59)), "0m 59s");
        assert_eq!(format_duration(Duration::seconds(3_903)), "1h 05m 03s");
        assert_eq!(format_duration(Duration::seconds(-4)), "0m 00s");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_status_json_shape() {
        let status = EngineStatus::Degraded {
            last_known: None,
            reason: ErrorKind::ExternalToolUnavailable,
        };
        let json = format_json(&status).unwrap();
        assert_eq!(
            json,
            r#"{"status":"degraded","last_known":null,"reason":{"kind":"external_tool_unavailable"}}"#
        );
    }

    #[test]
    fn test_degraded_text_mentions_last_known() {
        colored::control::set_override(false);
        let status = EngineStatus::Degraded {
            last_known: Some(TimerState::active(["work"], Utc::now())),
            reason: ErrorKind::ExternalToolUnavailable,
        };
        let text = format_status(&status);
        assert!(text.contains("Degraded"));
        assert!(text.contains("last known"));
        assert!(text.contains("work"));
    }

    #[test]
    fn test_failed_outcome_text() {
        colored::control::set_override(false);
        let text = format_outcome(&CommandOutcome::failed(ErrorKind::NotActive));
        assert_eq!(text, "✗ No timer is running");
    }

    #[test]
    fn test_history_table_lists_tags() {
        let entries = vec![TagHistoryEntry {
            tag_set_key: "a\u{1f}b".into(),
            raw_tags: vec!["b".into(), "a".into()],
            last_used_at: Utc::now(),
        }];
        let table = format_history_table(&entries);
        assert!(table.contains("b a"));
    }
}
