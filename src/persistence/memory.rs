//! In-memory implementation of the persistence gateway.
//!
//! All tables live behind one [`tokio::sync::Mutex`]. A transaction holds
//! the lock for its whole lifetime and writes into a staged copy of the
//! tables; commit swaps the copy in, drop throws it away. Transactions are
//! therefore fully serialized, and reads issued while a transaction is
//! open wait for it to finish.
//!
//! Constraint checks mirror the PostgreSQL schema in `migrations/`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    Database, EventRepository, JoinOutcome, OwnerRepository, ParticipationRepository,
    Transaction, WriteOutcome,
};
use crate::domain::{
    Event, EventId, EventStatus, Owner, OwnerId, Participation, User, UserId, Vote, VoteRecord,
};
use crate::error::RsvpError;

type PairKey = (EventId, UserId);

#[derive(Debug, Clone, Default)]
struct Tables {
    owners: HashMap<OwnerId, Owner>,
    events: HashMap<EventId, Event>,
    participants: HashMap<PairKey, Participation>,
    votes: HashMap<PairKey, VoteRecord>,
}

/// Process-local store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Exclusive transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    committed: OwnedMutexGuard<Tables>,
    staged: Tables,
}

impl Transaction for MemoryTransaction {
    async fn commit(self) -> Result<(), RsvpError> {
        let Self {
            mut committed,
            staged,
        } = self;
        *committed = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RsvpError> {
        drop(self);
        Ok(())
    }
}

impl Database for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, RsvpError> {
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let staged = committed.clone();
        Ok(MemoryTransaction { committed, staged })
    }
}

fn later(current: DateTime<Utc>, proposed: DateTime<Utc>) -> DateTime<Utc> {
    current.max(proposed)
}

impl OwnerRepository for MemoryStore {
    async fn create_owner(&self, tx: &mut MemoryTransaction, owner: &Owner) -> Result<(), RsvpError> {
        if tx.staged.owners.contains_key(&owner.id) {
            return Err(RsvpError::Conflict(format!("owner {} already exists", owner.id)));
        }
        tx.staged.owners.insert(owner.id.clone(), owner.clone());
        Ok(())
    }

    async fn get_owner(&self, owner_id: &OwnerId) -> Result<Owner, RsvpError> {
        self.tables
            .lock()
            .await
            .owners
            .get(owner_id)
            .cloned()
            .ok_or_else(|| RsvpError::NotFound(format!("owner {owner_id}")))
    }
}

fn active_event<'a>(tables: &'a Tables, owner_id: &OwnerId) -> Option<&'a Event> {
    tables
        .events
        .values()
        .filter(|e| &e.owner_id == owner_id && !e.status.is_terminal())
        .max_by_key(|e| e.created_at)
}

impl EventRepository for MemoryStore {
    async fn create_event(&self, tx: &mut MemoryTransaction, event: &Event) -> Result<(), RsvpError> {
        if tx.staged.events.contains_key(&event.id) {
            return Err(RsvpError::Conflict(format!("event {} already exists", event.id)));
        }
        if !event.status.is_terminal() && active_event(&tx.staged, &event.owner_id).is_some() {
            return Err(RsvpError::Conflict(format!(
                "owner {} already has an active event",
                event.owner_id
            )));
        }
        tx.staged.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event_status(
        &self,
        tx: &mut MemoryTransaction,
        event: &Event,
    ) -> Result<WriteOutcome, RsvpError> {
        let Some(stored) = tx
            .staged
            .events
            .get_mut(&event.id)
            .filter(|e| e.owner_id == event.owner_id)
        else {
            return Ok(WriteOutcome::NotFound);
        };
        if stored.status.is_terminal() {
            return Ok(WriteOutcome::AlreadyTerminal);
        }
        stored.status = event.status;
        stored.updated_at = later(stored.updated_at, event.updated_at);
        Ok(WriteOutcome::Updated)
    }

    async fn find_active_event_for_update(
        &self,
        tx: &mut MemoryTransaction,
        owner_id: &OwnerId,
    ) -> Result<Option<Event>, RsvpError> {
        Ok(active_event(&tx.staged, owner_id).cloned())
    }

    async fn get_event_by_owner(
        &self,
        owner_id: &OwnerId,
        status: Option<EventStatus>,
    ) -> Result<Event, RsvpError> {
        let tables = self.tables.lock().await;
        active_event(&tables, owner_id)
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .ok_or_else(|| RsvpError::NotFound(format!("no active event for owner {owner_id}")))
    }

    async fn get_event_by_id(&self, event_id: EventId) -> Result<Event, RsvpError> {
        self.tables
            .lock()
            .await
            .events
            .get(&event_id)
            .cloned()
            .ok_or_else(|| RsvpError::NotFound(format!("event {event_id}")))
    }

    async fn list_events(&self, status: EventStatus) -> Result<Vec<Event>, RsvpError> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}

impl ParticipationRepository for MemoryStore {
    async fn create_participation(
        &self,
        tx: &mut MemoryTransaction,
        participation: &Participation,
    ) -> Result<JoinOutcome, RsvpError> {
        if !tx.staged.events.contains_key(&participation.event_id) {
            return Err(RsvpError::NotFound(format!("event {}", participation.event_id)));
        }
        let key = (participation.event_id, participation.user_id.clone());

        let outcome = match tx.staged.participants.get_mut(&key) {
            Some(existing) => {
                existing.is_participated = true;
                existing.updated_at = later(existing.updated_at, participation.updated_at);
                JoinOutcome::Rejoined
            }
            None => {
                let mut fresh = participation.clone();
                fresh.is_participated = true;
                tx.staged.participants.insert(key.clone(), fresh);
                JoinOutcome::Created
            }
        };

        tx.staged.votes.entry(key).or_insert_with(|| VoteRecord {
            user_id: participation.user_id.clone(),
            event_id: participation.event_id,
            vote: Vote::NotVoted,
            created_at: participation.created_at,
            updated_at: participation.updated_at,
        });
        Ok(outcome)
    }

    async fn update_participation(
        &self,
        tx: &mut MemoryTransaction,
        participation: &Participation,
    ) -> Result<WriteOutcome, RsvpError> {
        let key = (participation.event_id, participation.user_id.clone());
        let Some(existing) = tx.staged.participants.get_mut(&key) else {
            return Ok(WriteOutcome::NotFound);
        };
        existing.is_participated = participation.is_participated;
        existing.updated_at = later(existing.updated_at, participation.updated_at);
        Ok(WriteOutcome::Updated)
    }

    async fn vote(&self, tx: &mut MemoryTransaction, record: &VoteRecord) -> Result<WriteOutcome, RsvpError> {
        let key = (record.event_id, record.user_id.clone());
        let Some(existing) = tx.staged.votes.get_mut(&key) else {
            return Ok(WriteOutcome::NotFound);
        };
        existing.vote = record.vote;
        existing.updated_at = later(existing.updated_at, record.updated_at);
        Ok(WriteOutcome::Updated)
    }

    async fn get_participation(
        &self,
        user_id: &UserId,
        event_id: EventId,
    ) -> Result<Participation, RsvpError> {
        self.tables
            .lock()
            .await
            .participants
            .get(&(event_id, user_id.clone()))
            .cloned()
            .ok_or_else(|| RsvpError::NotFound(format!("user {user_id} has not joined {event_id}")))
    }

    async fn get_participation_by_user_and_status(
        &self,
        user_id: &UserId,
        is_participated: bool,
    ) -> Result<User, RsvpError> {
        let tables = self.tables.lock().await;
        tables
            .participants
            .values()
            .filter(|p| &p.user_id == user_id && p.is_participated == is_participated)
            .max_by_key(|p| p.updated_at)
            .and_then(|p| {
                let vote = tables.votes.get(&(p.event_id, p.user_id.clone()))?;
                Some(User {
                    id: p.user_id.clone(),
                    event_id: p.event_id,
                    is_participated: p.is_participated,
                    vote: vote.vote,
                    created_at: p.created_at,
                    updated_at: p.updated_at,
                })
            })
            .ok_or_else(|| RsvpError::NotFound(format!("no participation for user {user_id}")))
    }
}
