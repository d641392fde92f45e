//! Replies sent back to the chat user.

use std::fmt;

use crate::domain::{EventId, Vote};

const HELP_TEXT: &str = "This bot collects feedback from event participants.\n\
Hosts: `open`, `start`, `close`, `finish`, `cancel`.\n\
Participants: `join`, `join <event-id>`, `leave`, `vote`, `voted <1-4>`.";

/// Outcome of one inbound callback, rendered as plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The user followed the bot.
    Welcome,
    /// Usage text.
    Help,
    /// A standby event is ready; asks whether to start it.
    ConfirmStart,
    /// The event was opened.
    EventStarted(EventId),
    /// Asks whether to close the open event.
    ConfirmFinish,
    /// The event was closed.
    EventFinished,
    /// A pending confirmation was aborted.
    Cancelled,
    /// Open events the user may join.
    OpenEvents(Vec<EventId>),
    /// No event is open.
    NoOpenEvents,
    /// The user joined an event.
    Joined(EventId),
    /// The user left their event.
    Left,
    /// The vote choices.
    VoteChoices,
    /// A vote was recorded.
    Voted(Vote),
    /// Echo of unrecognised text.
    Echo(String),
    /// The user is hosting an open event and cannot do this.
    HostingOpenEvent,
    /// The user has no open event to close.
    NotHosting,
    /// The user has no standby event to start.
    NothingToStart,
    /// The user is already in another event.
    ParticipatingElsewhere,
    /// The user is already in this event.
    AlreadyJoined,
    /// The user is not in any event.
    NotParticipating,
    /// The event exists but has not started.
    EventNotStarted,
    /// The event has already been closed.
    EventAlreadyClosed,
    /// No event has this id.
    UnknownEvent,
    /// The command argument was malformed.
    InvalidInput(String),
    /// Storage failed while handling the request.
    Failed,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome => f.write_str("Thanks for following! Send `help` to see what I can do."),
            Self::Help => f.write_str(HELP_TEXT),
            Self::ConfirmStart => {
                f.write_str("Your event is ready. Send `start` to open it or `cancel` to go back.")
            }
            Self::EventStarted(id) => write!(
                f,
                "Your event is open.\nShare this event id with participants:\n{id}"
            ),
            Self::ConfirmFinish => f.write_str("Send `finish` to close your event or `cancel` to go back."),
            Self::EventFinished => f.write_str("Your event is closed."),
            Self::Cancelled => f.write_str("Cancelled."),
            Self::OpenEvents(ids) => {
                f.write_str("Open events. Send `join <event-id>` to join one:")?;
                for id in ids {
                    write!(f, "\n{id}")?;
                }
                Ok(())
            }
            Self::NoOpenEvents => f.write_str("There are no open events right now."),
            Self::Joined(id) => write!(f, "You joined event {id}."),
            Self::Left => f.write_str("You left the event."),
            Self::VoteChoices => {
                f.write_str("How was the event? Send `voted <n>`:")?;
                for (n, vote) in (1..).zip(Vote::CHOICES) {
                    write!(f, "\n{n}: {}", vote.label())?;
                }
                Ok(())
            }
            Self::Voted(vote) => write!(f, "You voted \"{}\".", vote.label()),
            Self::Echo(text) => f.write_str(text),
            Self::HostingOpenEvent => f.write_str("You are hosting an open event."),
            Self::NotHosting => f.write_str("You are not hosting an open event."),
            Self::NothingToStart => f.write_str("You have no event to start. Send `open` first."),
            Self::ParticipatingElsewhere => f.write_str("You are already in another event."),
            Self::AlreadyJoined => f.write_str("You are already in this event."),
            Self::NotParticipating => f.write_str("You have not joined an event yet."),
            Self::EventNotStarted => f.write_str("This event has not started yet."),
            Self::EventAlreadyClosed => f.write_str("This event has already closed."),
            Self::UnknownEvent => f.write_str("No event has that id."),
            Self::InvalidInput(reason) => write!(f, "Sorry, I could not read that: {reason}"),
            Self::Failed => f.write_str("Something went wrong. Please try again."),
        }
    }
}
