//! Parsing of Timewarrior's JSON export.
//!
//! This is the only module that knows the tool's output format. The export
//! is an array of intervals in chronological order; an interval without an
//! `end` is the running session.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::domain::{ParseError, TimerState};

/// Timestamp layout used by the export (`20250314T093000Z`).
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Raw interval as exported.
#[derive(Debug, Deserialize)]
struct RawInterval {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    annotation: Option<String>,
}

/// Parse the export into a timer snapshot.
///
/// Empty output and an empty array both mean no timer is running.
///
/// # Errors
/// Returns `ParseError::Malformed` if the output is not an array of
/// intervals, or the open interval lacks a valid start time.
pub fn parse(stdout: &str) -> Result<TimerState, ParseError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(TimerState::inactive());
    }

    let intervals: Vec<RawInterval> = serde_json::from_str(trimmed)
        .map_err(|e| ParseError::malformed(format!("expected an array of intervals: {e}")))?;

    let Some(open) = intervals.into_iter().rev().find(|i| i.end.is_none()) else {
        return Ok(TimerState::inactive());
    };

    let start = open
        .start
        .as_deref()
        .ok_or_else(|| ParseError::malformed("open interval has no start"))?;
    let started_at = parse_timestamp(start)
        .ok_or_else(|| ParseError::malformed(format!("unreadable start time {start:?}")))?;

    Ok(TimerState::active(open.tags, started_at).with_annotation(open.annotation))
}

/// Parse a timestamp in the export's compact UTC form.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
