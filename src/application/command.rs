//! Textual command contract carried by IPC transports.
//!
//! A line such as `startTimer work client-a` maps to a [`CommandRequest`];
//! everything after the command name is split on whitespace into tags.

use crate::domain::CommandRequest;

/// Command names understood by [`parse_command`], canonical form first.
pub const COMMAND_NAMES: [&str; 4] = ["startOrStop", "startTimer", "stopTimer", "editTags"];

/// Error for a line that names no known command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {name}. Use: {}", COMMAND_NAMES.join(", "))]
    Unknown { name: String },

    #[error("{name} takes no arguments")]
    UnexpectedArguments { name: String },
}

/// Parse one textual command.
///
/// # Errors
/// Returns `CommandParseError` for an empty line, an unknown command name,
/// or arguments passed to a command that takes none.
pub fn parse_command(line: &str) -> Result<CommandRequest, CommandParseError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(CommandParseError::Empty)?;
    let tags: Vec<String> = words.map(String::from).collect();

    let has_args = !tags.is_empty();
    let no_args = move |request: CommandRequest| {
        if has_args {
            Err(CommandParseError::UnexpectedArguments {
                name: name.to_string(),
            })
        } else {
            Ok(request)
        }
    };

    match name {
        "startOrStop" | "start-or-stop" | "toggle" => no_args(CommandRequest::start_or_stop()),
        "stopTimer" | "stop" => no_args(CommandRequest::stop_timer()),
        "startTimer" | "start" => Ok(CommandRequest::start_timer(tags)),
        "editTags" | "edit-tags" | "retag" => Ok(CommandRequest::edit_tags(tags)),
        other => Err(CommandParseError::Unknown {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommandKind;

    #[test]
    fn test_start_splits_tags_on_whitespace() {
        let request = parse_command("startTimer  work\tclient-a \n").unwrap();
        assert_eq!(request.kind, CommandKind::StartTimer);
        assert_eq!(
            request.payload_tags,
            Some(vec!["work".to_string(), "client-a".to_string()])
        );
    }

    #[test]
    fn test_start_without_tags() {
        let request = parse_command("startTimer").unwrap();
        assert_eq!(request.payload_tags, Some(Vec::new()));
    }

    #[test]
    fn test_canonical_names() {
        for name in COMMAND_NAMES {
            assert!(parse_command(name).is_ok(), "{name}");
        }
        assert_eq!(
            parse_command("editTags review").unwrap().kind,
            CommandKind::EditTags
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(parse_command("toggle").unwrap().kind, CommandKind::StartOrStop);
        assert_eq!(parse_command("stop").unwrap().kind, CommandKind::StopTimer);
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        assert_eq!(parse_command("   "), Err(CommandParseError::Empty));
        assert!(matches!(
            parse_command("pause"),
            Err(CommandParseError::Unknown { .. })
        ));
    }

    #[test]
    fn test_stop_takes_no_arguments() {
        assert!(matches!(
            parse_command("stopTimer now"),
            Err(CommandParseError::UnexpectedArguments { .. })
        ));
    }
}
