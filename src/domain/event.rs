//! Hosted events and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, OwnerId};
use crate::error::RsvpError;

/// Lifecycle stage of an [`Event`].
///
/// Ordered: an event only ever moves forward through
/// `Standby -> Open -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Registered by its owner but not yet accepting participants.
    Standby,
    /// Accepting participants and votes.
    Open,
    /// Finished. No further transitions.
    Closed,
}

impl EventStatus {
    /// Returns the `SMALLINT` stored in `event_statuses.status`.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Standby => 0,
            Self::Open => 1,
            Self::Closed => 2,
        }
    }

    /// Returns `true` for the terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if moving from `self` to `next` is a forward step.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        next > self
    }
}

impl TryFrom<i16> for EventStatus {
    type Error = RsvpError;

    fn try_from(raw: i16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Standby),
            1 => Ok(Self::Open),
            2 => Ok(Self::Closed),
            other => Err(RsvpError::Internal(format!(
                "unknown event status {other} in storage"
            ))),
        }
    }
}

/// An event hosted by a single owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier (immutable after creation).
    pub id: EventId,
    /// Owner hosting the event.
    pub owner_id: OwnerId,
    /// Current lifecycle stage.
    pub status: EventStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status change.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Creates a fresh event in [`EventStatus::Standby`] for `owner_id`.
    #[must_use]
    pub fn standby(owner_id: OwnerId, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            owner_id,
            status: EventStatus::Standby,
            created_at: now,
            updated_at: now,
        }
    }
}
