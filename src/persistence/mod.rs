//! Persistence gateway: transactional access to owners, events, and
//! participations.
//!
//! Three narrow repository traits ([`OwnerRepository`],
//! [`EventRepository`], [`ParticipationRepository`]) sit on top of a
//! shared [`Database`] that hands out transactions. Every write takes the
//! caller's transaction handle explicitly; reads go to the read path,
//! which may be a lagging replica.
//!
//! A transaction is released exactly once: [`Transaction::commit`] or
//! [`Transaction::rollback`] consume the handle, and dropping an
//! uncommitted handle (early return, `?`, unwinding) rolls it back.
//!
//! Two implementations are provided: [`postgres::PostgresStore`] over
//! `sqlx::PgPool`, and [`memory::MemoryStore`] for tests and
//! database-less deployments.

pub mod memory;
pub mod models;
pub mod postgres;

use std::future::Future;

use crate::domain::{
    Event, EventId, EventStatus, Owner, OwnerId, Participation, User, UserId, VoteRecord,
};
use crate::error::RsvpError;

/// Result of a keyed single-row update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Exactly one row was changed.
    Updated,
    /// No row matched the key.
    NotFound,
    /// The row exists but is in a terminal state and was left untouched.
    AlreadyTerminal,
}

/// Result of [`ParticipationRepository::create_participation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new participation and its seed vote were inserted.
    Created,
    /// An existing participation was reactivated; its vote is untouched.
    Rejoined,
}

/// An open transaction on the primary (write) path.
pub trait Transaction: Send {
    /// Commits every write performed through this handle.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if the commit fails; the
    /// transaction is rolled back in that case.
    fn commit(self) -> impl Future<Output = Result<(), RsvpError>> + Send;

    /// Discards every write performed through this handle.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if the rollback itself fails.
    fn rollback(self) -> impl Future<Output = Result<(), RsvpError>> + Send;
}

/// Connection source shared by all repositories.
pub trait Database: Clone + Send + Sync + 'static {
    /// Transaction handle passed to every write.
    type Tx: Transaction;

    /// Opens a transaction on the primary.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if no connection is available.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RsvpError>> + Send;
}

/// Storage for [`Owner`] records.
pub trait OwnerRepository: Database {
    /// Inserts an owner. Always attempts the insert.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Conflict`] if the owner already exists.
    fn create_owner(
        &self,
        tx: &mut Self::Tx,
        owner: &Owner,
    ) -> impl Future<Output = Result<(), RsvpError>> + Send;

    /// Loads an owner from the read path.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if no such owner is registered.
    fn get_owner(
        &self,
        owner_id: &OwnerId,
    ) -> impl Future<Output = Result<Owner, RsvpError>> + Send;
}

/// Storage for [`Event`] records and their status rows.
pub trait EventRepository: Database {
    /// Inserts the event row and its initial status row.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Conflict`] if the id is taken or the owner
    /// already has a non-closed event.
    fn create_event(
        &self,
        tx: &mut Self::Tx,
        event: &Event,
    ) -> impl Future<Output = Result<(), RsvpError>> + Send;

    /// Writes `event.status` and `event.updated_at` to the status row of
    /// `event.id`, unless that row is already closed.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on database failure.
    fn update_event_status(
        &self,
        tx: &mut Self::Tx,
        event: &Event,
    ) -> impl Future<Output = Result<WriteOutcome, RsvpError>> + Send;

    /// Loads and locks the owner's non-closed event inside `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on database failure.
    fn find_active_event_for_update(
        &self,
        tx: &mut Self::Tx,
        owner_id: &OwnerId,
    ) -> impl Future<Output = Result<Option<Event>, RsvpError>> + Send;

    /// Loads the owner's non-closed event, optionally restricted to
    /// `status`. Closed events never match.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if no event matches.
    fn get_event_by_owner(
        &self,
        owner_id: &OwnerId,
        status: Option<EventStatus>,
    ) -> impl Future<Output = Result<Event, RsvpError>> + Send;

    /// Loads an event by id regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the id is unknown.
    fn get_event_by_id(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Event, RsvpError>> + Send;

    /// Lists events in `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on database failure.
    fn list_events(
        &self,
        status: EventStatus,
    ) -> impl Future<Output = Result<Vec<Event>, RsvpError>> + Send;
}

/// Storage for [`Participation`] rows and their paired votes.
pub trait ParticipationRepository: Database {
    /// Inserts the participation together with a `NotVoted` seed vote, or
    /// reactivates the existing participation for the same pair. Never
    /// creates a second vote row.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on database failure.
    fn create_participation(
        &self,
        tx: &mut Self::Tx,
        participation: &Participation,
    ) -> impl Future<Output = Result<JoinOutcome, RsvpError>> + Send;

    /// Writes `is_participated` and `updated_at` for the
    /// `(user_id, event_id)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on database failure.
    fn update_participation(
        &self,
        tx: &mut Self::Tx,
        participation: &Participation,
    ) -> impl Future<Output = Result<WriteOutcome, RsvpError>> + Send;

    /// Writes the vote value for the `(user_id, event_id)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on database failure.
    fn vote(
        &self,
        tx: &mut Self::Tx,
        record: &VoteRecord,
    ) -> impl Future<Output = Result<WriteOutcome, RsvpError>> + Send;

    /// Loads the participation for one `(user, event)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the user never joined the event.
    fn get_participation(
        &self,
        user_id: &UserId,
        event_id: EventId,
    ) -> impl Future<Output = Result<Participation, RsvpError>> + Send;

    /// Loads the user's most recently changed participation with the given
    /// `is_participated` flag, joined with its vote.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if no participation matches.
    fn get_participation_by_user_and_status(
        &self,
        user_id: &UserId,
        is_participated: bool,
    ) -> impl Future<Output = Result<User, RsvpError>> + Send;
}

/// Everything the coordination service needs from storage.
pub trait Store: OwnerRepository + EventRepository + ParticipationRepository {}

impl<T> Store for T where T: OwnerRepository + EventRepository + ParticipationRepository {}
