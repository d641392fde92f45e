//! Raw row shapes for the relational schema.
//!
//! Rows are fetched as tuples and converted here so enum decoding lives
//! in one place.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Event, EventId, EventStatus, Owner, OwnerId, Participation, User, UserId, Vote};
use crate::error::RsvpError;

/// Row of `owners`.
pub type OwnerRow = (String, DateTime<Utc>, DateTime<Utc>);

/// Row of `event_statuses`.
pub type EventRow = (Uuid, String, i16, DateTime<Utc>, DateTime<Utc>);

/// Row of `event_participants`.
pub type ParticipationRow = (String, Uuid, bool, DateTime<Utc>, DateTime<Utc>);

/// Row of `event_participants` joined with `event_votes.vote`.
pub type UserRow = (String, Uuid, bool, i16, DateTime<Utc>, DateTime<Utc>);

/// Converts an `owners` row.
#[must_use]
pub fn owner_from_row((owner_id, created_at, updated_at): OwnerRow) -> Owner {
    Owner {
        id: OwnerId::new(owner_id),
        created_at,
        updated_at,
    }
}

/// Converts an `event_statuses` row.
///
/// # Errors
///
/// Returns [`RsvpError::Internal`] if the stored status is unknown.
pub fn event_from_row(
    (event_id, owner_id, status, created_at, updated_at): EventRow,
) -> Result<Event, RsvpError> {
    Ok(Event {
        id: EventId::from_uuid(event_id),
        owner_id: OwnerId::new(owner_id),
        status: EventStatus::try_from(status)?,
        created_at,
        updated_at,
    })
}

/// Converts an `event_participants` row.
#[must_use]
pub fn participation_from_row(
    (user_id, event_id, is_participated, created_at, updated_at): ParticipationRow,
) -> Participation {
    Participation {
        user_id: UserId::new(user_id),
        event_id: EventId::from_uuid(event_id),
        is_participated,
        created_at,
        updated_at,
    }
}

/// Converts a participation row joined with its vote.
///
/// # Errors
///
/// Returns [`RsvpError::InvalidRequest`] if the stored vote is unknown.
pub fn user_from_row(
    (user_id, event_id, is_participated, vote, created_at, updated_at): UserRow,
) -> Result<User, RsvpError> {
    Ok(User {
        id: UserId::new(user_id),
        event_id: EventId::from_uuid(event_id),
        is_participated,
        vote: Vote::try_from(vote)?,
        created_at,
        updated_at,
    })
}
