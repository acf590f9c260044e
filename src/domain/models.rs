//! Domain models for the mirrored timer state.
//!
//! These values are immutable snapshots handed out by the sync engine; the
//! engine is the only owner of the live state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::error::ErrorKind;

/// Collapse duplicate tags, keeping the first occurrence of each.
///
/// Comparison is case-sensitive, so `Work` and `work` are distinct tags.
pub fn dedup_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.into();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Snapshot of the external tool's timer.
///
/// `started_at` is present exactly when `active` is true; the constructors
/// are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TimerState {
    active: bool,
    tags: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation: Option<String>,
}

impl TimerState {
    /// No session is being tracked.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// A running session started at `started_at`.
    #[must_use]
    pub fn active<I, S>(tags: I, started_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: true,
            tags: dedup_tags(tags),
            started_at: Some(started_at),
            annotation: None,
        }
    }

    /// Attach the tool's annotation to an active session.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Option<String>) -> Self {
        if self.active {
            self.annotation = annotation.filter(|a| !a.is_empty());
        }
        self
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// Time tracked so far, measured against `now`. `None` when inactive.
    #[must_use]
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.started_at
            .map(|started| (now - started).max(Duration::zero()))
    }

    /// Time tracked so far. `None` when inactive.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_at(Utc::now())
    }
}

/// One remembered tag-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagHistoryEntry {
    /// Sorted tags joined with the history separator.
    pub tag_set_key: String,
    /// Tags in the order they were last entered.
    pub raw_tags: Vec<String>,
    pub last_used_at: DateTime<Utc>,
}

/// Kind of mutating command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    StartTimer,
    StopTimer,
    EditTags,
    StartOrStop,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartTimer => write!(f, "startTimer"),
            Self::StopTimer => write!(f, "stopTimer"),
            Self::EditTags => write!(f, "editTags"),
            Self::StartOrStop => write!(f, "startOrStop"),
        }
    }
}

/// A command issued by a UI widget or IPC handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    pub kind: CommandKind,
    pub payload_tags: Option<Vec<String>>,
}

impl CommandRequest {
    #[must_use]
    pub fn start_timer(tags: Vec<String>) -> Self {
        Self {
            kind: CommandKind::StartTimer,
            payload_tags: Some(tags),
        }
    }

    #[must_use]
    pub const fn stop_timer() -> Self {
        Self {
            kind: CommandKind::StopTimer,
            payload_tags: None,
        }
    }

    #[must_use]
    pub fn edit_tags(tags: Vec<String>) -> Self {
        Self {
            kind: CommandKind::EditTags,
            payload_tags: Some(tags),
        }
    }

    #[must_use]
    pub const fn start_or_stop() -> Self {
        Self {
            kind: CommandKind::StartOrStop,
            payload_tags: None,
        }
    }
}

/// Result of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub resulting_state: Option<TimerState>,
    pub error: Option<ErrorKind>,
}

impl CommandOutcome {
    #[must_use]
    pub const fn succeeded(resulting_state: Option<TimerState>) -> Self {
        Self {
            success: true,
            resulting_state,
            error: None,
        }
    }

    #[must_use]
    pub const fn failed(error: ErrorKind) -> Self {
        Self {
            success: false,
            resulting_state: None,
            error: Some(error),
        }
    }

    /// Convert into a `Result`, for callers that prefer `?`.
    ///
    /// # Errors
    /// Returns the carried `ErrorKind` when the command failed.
    pub fn into_result(self) -> std::result::Result<Option<TimerState>, ErrorKind> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.resulting_state),
        }
    }
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// The observed timer state differs from the previous snapshot.
    StateChanged(TimerState),
    /// A tag-set was recorded into the history.
    TagsHistoryUpdated,
    /// A command was rejected or failed.
    CommandFailed(ErrorKind),
    /// Polling started failing, or failed for a different reason.
    Degraded(ErrorKind),
    /// Polling succeeded again after being degraded.
    Recovered,
}

/// Queryable engine state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    /// No poll has completed yet.
    #[default]
    Uninitialized,
    /// The last poll succeeded.
    Synced { state: TimerState },
    /// The last poll failed; `last_known` is the newest good snapshot.
    Degraded {
        last_known: Option<TimerState>,
        reason: ErrorKind,
    },
}

impl EngineStatus {
    /// The freshest known state, stale or not.
    #[must_use]
    pub const fn last_known(&self) -> Option<&TimerState> {
        match self {
            Self::Uninitialized => None,
            Self::Synced { state } => Some(state),
            Self::Degraded { last_known, .. } => last_known.as_ref(),
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}
