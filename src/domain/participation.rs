//! Owners, participations, and votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, OwnerId, UserId};
use crate::error::RsvpError;

/// A user registered as a potential event host.
///
/// Created once on first contact and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// External platform identifier.
    pub id: OwnerId,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last touch timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    /// Creates an owner record stamped with `now`.
    #[must_use]
    pub fn new(id: OwnerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Rating a participant gives an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    /// Seed value written when the participant first joins.
    NotVoted,
    /// Highest rating.
    Great,
    /// Positive rating.
    Good,
    /// Lukewarm rating.
    NotGood,
    /// Lowest rating.
    Bad,
}

impl Vote {
    /// Ratings a participant may actively choose, best first.
    pub const CHOICES: [Self; 4] = [Self::Great, Self::Good, Self::NotGood, Self::Bad];

    /// Returns the `SMALLINT` stored in `event_votes.vote`.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::NotVoted => 0,
            Self::Great => 1,
            Self::Good => 2,
            Self::NotGood => 3,
            Self::Bad => 4,
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotVoted => "not voted",
            Self::Great => "great",
            Self::Good => "good",
            Self::NotGood => "not good",
            Self::Bad => "bad",
        }
    }
}

impl TryFrom<i16> for Vote {
    type Error = RsvpError;

    fn try_from(raw: i16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::NotVoted),
            1 => Ok(Self::Great),
            2 => Ok(Self::Good),
            3 => Ok(Self::NotGood),
            4 => Ok(Self::Bad),
            other => Err(RsvpError::InvalidRequest(format!("unknown vote value {other}"))),
        }
    }
}

/// A user's membership in one event.
///
/// Leaving flips `is_participated` to `false`; the row is kept so a later
/// join reactivates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// Participating user.
    pub user_id: UserId,
    /// Event joined.
    pub event_id: EventId,
    /// Whether the membership is currently active.
    pub is_participated: bool,
    /// First join timestamp.
    pub created_at: DateTime<Utc>,
    /// Last join/leave timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Participation {
    /// Creates an active participation stamped with `now`.
    #[must_use]
    pub fn joined(user_id: UserId, event_id: EventId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            event_id,
            is_participated: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The vote row paired with a [`Participation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Voting user.
    pub user_id: UserId,
    /// Event voted on.
    pub event_id: EventId,
    /// Current rating.
    pub vote: Vote,
    /// Seed timestamp.
    pub created_at: DateTime<Utc>,
    /// Last vote timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A user's participation joined with its vote.
///
/// Returned by the "which event am I in" query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Event the user participates in.
    pub event_id: EventId,
    /// Whether the membership is currently active.
    pub is_participated: bool,
    /// Current rating.
    pub vote: Vote,
    /// First join timestamp.
    pub created_at: DateTime<Utc>,
    /// Last participation change.
    pub updated_at: DateTime<Utc>,
}
