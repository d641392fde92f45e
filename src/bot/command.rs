//! Text commands accepted from chat messages.

use crate::domain::{EventId, Vote};
use crate::error::RsvpError;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show usage.
    Help,
    /// Prepare a standby event and ask for confirmation.
    Open,
    /// Open the standby event to participants.
    Start,
    /// Ask for confirmation before closing the open event.
    Close,
    /// Close the open event.
    Finish,
    /// Abort a pending confirmation.
    Cancel,
    /// List open events.
    ListEvents,
    /// Join the given event.
    Join(EventId),
    /// Leave the event the user is in.
    Leave,
    /// Show the vote choices.
    ShowVotes,
    /// Cast a vote in the current event.
    Voted(Vote),
    /// Unrecognised text, echoed back verbatim.
    Echo(String),
}

impl Command {
    /// Parses a message body.
    ///
    /// Keywords are matched case-insensitively after trimming. Any text
    /// that does not start with a keyword becomes [`Command::Echo`].
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::InvalidRequest`] when a keyword is followed by
    /// a malformed argument (`join <not-an-id>`, `voted 7`).
    pub fn parse(text: &str) -> Result<Self, RsvpError> {
        let trimmed = text.trim();
        let mut words = trimmed.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();
        let extra = words.next();

        let command = match (keyword.as_str(), argument, extra) {
            ("help", None, _) => Self::Help,
            ("open", None, _) => Self::Open,
            ("start", None, _) => Self::Start,
            ("close", None, _) => Self::Close,
            ("finish", None, _) => Self::Finish,
            ("cancel", None, _) => Self::Cancel,
            ("join", None, _) => Self::ListEvents,
            ("join", Some(raw), None) => Self::Join(raw.parse()?),
            ("leave", None, _) => Self::Leave,
            ("vote", None, _) => Self::ShowVotes,
            ("voted", Some(raw), None) => Self::Voted(parse_choice(raw)?),
            _ => Self::Echo(text.to_string()),
        };
        Ok(command)
    }
}

/// Maps the 1-based position in [`Vote::CHOICES`] to a vote.
fn parse_choice(raw: &str) -> Result<Vote, RsvpError> {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| Vote::CHOICES.get(idx).copied())
        .ok_or_else(|| RsvpError::InvalidRequest(format!("vote must be 1 to 4, got `{raw}`")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn keywords_ignore_case_and_padding() {
        assert_eq!(Command::parse("  Open ").ok(), Some(Command::Open));
        assert_eq!(Command::parse("FINISH").ok(), Some(Command::Finish));
        assert_eq!(Command::parse("join").ok(), Some(Command::ListEvents));
    }

    #[test]
    fn join_with_id() {
        let id = EventId::new();
        let Ok(Command::Join(parsed)) = Command::parse(&format!("join {id}")) else {
            panic!("expected join command");
        };
        assert_eq!(parsed, id);
    }

    #[test]
    fn join_with_garbage_id_is_invalid() {
        assert!(matches!(
            Command::parse("join tomorrow"),
            Err(RsvpError::InvalidRequest(_))
        ));
    }

    #[test]
    fn voted_maps_positions_to_choices() {
        assert_eq!(Command::parse("voted 1").ok(), Some(Command::Voted(Vote::Great)));
        assert_eq!(Command::parse("voted 4").ok(), Some(Command::Voted(Vote::Bad)));
        assert!(Command::parse("voted 0").is_err());
        assert!(Command::parse("voted 5").is_err());
        assert!(Command::parse("voted great").is_err());
    }

    #[test]
    fn anything_else_is_echoed() {
        assert_eq!(
            Command::parse("see you at 7").ok(),
            Some(Command::Echo("see you at 7".to_string()))
        );
        assert_eq!(
            Command::parse("open the door").ok(),
            Some(Command::Echo("open the door".to_string()))
        );
        assert_eq!(Command::parse("").ok(), Some(Command::Echo(String::new())));
    }
}
