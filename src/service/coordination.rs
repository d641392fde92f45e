//! Coordination service: event lifecycle and participation rules.

use chrono::Utc;

use crate::domain::{
    Event, EventId, EventStatus, Owner, OwnerId, Participation, User, UserId, Vote, VoteRecord,
};
use crate::error::RsvpError;
use crate::persistence::{JoinOutcome, Store, Transaction, WriteOutcome};

/// Orchestration layer for every owner, event, and participation change.
///
/// Stateless coordinator over a [`Store`]. Every mutation follows the
/// pattern: open transaction → read/lock current state → validate →
/// write → commit. A transaction handle dropped on an error path rolls
/// back, so no mutation is ever half-applied. Nothing is retried.
#[derive(Debug, Clone)]
pub struct CoordinationService<S> {
    store: S,
}

impl<S: Store> CoordinationService<S> {
    /// Creates a new `CoordinationService`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the inner store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers `owner_id` as a host unless it is already known.
    ///
    /// Idempotent: a second call, or a concurrent call that wins the
    /// insert, is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on storage failure.
    pub async fn follow(&self, owner_id: &OwnerId) -> Result<Owner, RsvpError> {
        tracing::debug!(%owner_id, "follow");
        match self.store.get_owner(owner_id).await {
            Ok(owner) => return Ok(owner),
            Err(RsvpError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let owner = Owner::new(owner_id.clone(), Utc::now());
        let mut tx = self.store.begin().await?;
        match self.store.create_owner(&mut tx, &owner).await {
            Ok(()) => {
                tx.commit().await?;
                tracing::info!(%owner_id, "owner registered");
            }
            // Lost the race, or the replica has not caught up yet.
            Err(RsvpError::Conflict(_)) => {
                tracing::debug!(%owner_id, "owner already registered");
            }
            Err(e) => return Err(e),
        }
        Ok(owner)
    }

    /// Creates a new event in [`EventStatus::Standby`] for `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Conflict`] if the owner already has a
    /// non-closed event, [`RsvpError::Persistence`] on storage failure.
    pub async fn register_event(&self, owner_id: &OwnerId) -> Result<Event, RsvpError> {
        tracing::debug!(%owner_id, "register event");
        let event = Event::standby(owner_id.clone(), Utc::now());

        let mut tx = self.store.begin().await?;
        self.store.create_event(&mut tx, &event).await?;
        tx.commit().await?;

        tracing::info!(event_id = %event.id, %owner_id, "event registered");
        Ok(event)
    }

    /// Moves the owner's non-closed event to `status`.
    ///
    /// The event row is locked for the duration of the transaction and
    /// only forward transitions are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the owner has no non-closed event,
    /// [`RsvpError::IllegalTransition`] if `status` is not ahead of the
    /// current status, [`RsvpError::AlreadyClosed`] if the event was closed
    /// concurrently, [`RsvpError::Persistence`] on storage failure.
    pub async fn update_event_status(
        &self,
        owner_id: &OwnerId,
        status: EventStatus,
    ) -> Result<Event, RsvpError> {
        tracing::debug!(%owner_id, ?status, "update event status");
        let mut tx = self.store.begin().await?;

        let Some(mut event) = self
            .store
            .find_active_event_for_update(&mut tx, owner_id)
            .await?
        else {
            return Err(RsvpError::NotFound(format!(
                "no active event for owner {owner_id}"
            )));
        };

        if !event.status.can_transition_to(status) {
            tracing::warn!(event_id = %event.id, from = ?event.status, to = ?status, "rejected transition");
            return Err(RsvpError::IllegalTransition {
                from: event.status,
                to: status,
            });
        }

        event.status = status;
        event.updated_at = event.updated_at.max(Utc::now());

        match self.store.update_event_status(&mut tx, &event).await? {
            WriteOutcome::Updated => {}
            WriteOutcome::NotFound => {
                return Err(RsvpError::NotFound(format!("event {}", event.id)));
            }
            WriteOutcome::AlreadyTerminal => return Err(RsvpError::AlreadyClosed(event.id)),
        }
        tx.commit().await?;

        tracing::info!(event_id = %event.id, %owner_id, ?status, "event status changed");
        Ok(event)
    }

    /// Returns the owner's non-closed event, optionally restricted to
    /// `status`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if no event matches.
    pub async fn get_event_by_owner_id(
        &self,
        owner_id: &OwnerId,
        status: Option<EventStatus>,
    ) -> Result<Event, RsvpError> {
        self.store.get_event_by_owner(owner_id, status).await
    }

    /// Returns an event by id regardless of its status.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the id is unknown.
    pub async fn get_event_by_event_id(&self, event_id: EventId) -> Result<Event, RsvpError> {
        self.store.get_event_by_id(event_id).await
    }

    /// Returns all open events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] on storage failure.
    pub async fn get_active_events(&self) -> Result<Vec<Event>, RsvpError> {
        self.store.list_events(EventStatus::Open).await
    }

    /// Joins `user_id` to `event_id`, or reactivates a previous
    /// participation in the same event.
    ///
    /// The insert-or-reactivate is a single conditional write, so
    /// concurrent joins for the same pair never produce a second vote row.
    /// This does not check the event's status or the user's other
    /// participations; callers enforce those rules.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the event does not exist,
    /// [`RsvpError::Persistence`] on storage failure.
    pub async fn participate_event(
        &self,
        user_id: &UserId,
        event_id: EventId,
    ) -> Result<JoinOutcome, RsvpError> {
        tracing::debug!(%user_id, %event_id, "participate");
        let participation = Participation::joined(user_id.clone(), event_id, Utc::now());

        let mut tx = self.store.begin().await?;
        let outcome = self.store.create_participation(&mut tx, &participation).await?;
        tx.commit().await?;

        tracing::info!(%user_id, %event_id, ?outcome, "user joined event");
        Ok(outcome)
    }

    /// Marks the participation of `user_id` in `event_id` inactive.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the user never joined the event,
    /// [`RsvpError::Persistence`] on storage failure.
    pub async fn leave_event(&self, user_id: &UserId, event_id: EventId) -> Result<(), RsvpError> {
        tracing::debug!(%user_id, %event_id, "leave");
        let now = Utc::now();
        let participation = Participation {
            user_id: user_id.clone(),
            event_id,
            is_participated: false,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        if self.store.update_participation(&mut tx, &participation).await? != WriteOutcome::Updated {
            return Err(RsvpError::NotFound(format!(
                "user {user_id} has not joined {event_id}"
            )));
        }
        tx.commit().await?;

        tracing::info!(%user_id, %event_id, "user left event");
        Ok(())
    }

    /// Records the vote of `user_id` for `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the user never joined the event,
    /// [`RsvpError::Persistence`] on storage failure.
    pub async fn vote_event(
        &self,
        user_id: &UserId,
        event_id: EventId,
        vote: Vote,
    ) -> Result<(), RsvpError> {
        tracing::debug!(%user_id, %event_id, ?vote, "vote");
        let now = Utc::now();
        let record = VoteRecord {
            user_id: user_id.clone(),
            event_id,
            vote,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        if self.store.vote(&mut tx, &record).await? != WriteOutcome::Updated {
            return Err(RsvpError::NotFound(format!(
                "user {user_id} has not joined {event_id}"
            )));
        }
        tx.commit().await?;

        tracing::info!(%user_id, %event_id, ?vote, "vote recorded");
        Ok(())
    }

    /// Returns the event the user is actively participating in.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the user has no active
    /// participation.
    pub async fn get_participated_event(&self, user_id: &UserId) -> Result<User, RsvpError> {
        self.store
            .get_participation_by_user_and_status(user_id, true)
            .await
    }

    /// Returns the participation of `user_id` in `event_id`, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::NotFound`] if the user never joined the event.
    pub async fn get_participation(
        &self,
        user_id: &UserId,
        event_id: EventId,
    ) -> Result<Participation, RsvpError> {
        self.store.get_participation(user_id, event_id).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;

    fn make_service() -> CoordinationService<MemoryStore> {
        CoordinationService::new(MemoryStore::new())
    }

    async fn open_event(service: &CoordinationService<MemoryStore>, owner: &OwnerId) -> Event {
        let Ok(_) = service.register_event(owner).await else {
            panic!("register failed");
        };
        let Ok(event) = service.update_event_status(owner, EventStatus::Open).await else {
            panic!("open failed");
        };
        event
    }

    #[tokio::test]
    async fn follow_is_idempotent() {
        let service = make_service();
        let owner = OwnerId::new("O1");

        let Ok(first) = service.follow(&owner).await else {
            panic!("first follow failed");
        };
        let Ok(second) = service.follow(&owner).await else {
            panic!("second follow failed");
        };
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn full_lifecycle_scenario() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        let user = UserId::new("U1");

        let Ok(registered) = service.register_event(&owner).await else {
            panic!("register failed");
        };
        assert_eq!(registered.status, EventStatus::Standby);

        let Ok(opened) = service.update_event_status(&owner, EventStatus::Open).await else {
            panic!("open failed");
        };
        assert_eq!(opened.id, registered.id);
        assert_eq!(opened.status, EventStatus::Open);

        let joined = service.participate_event(&user, opened.id).await.ok();
        assert_eq!(joined, Some(JoinOutcome::Created));
        let Ok(me) = service.get_participated_event(&user).await else {
            panic!("participation missing");
        };
        assert!(me.is_participated);
        assert_eq!(me.vote, Vote::NotVoted);

        assert!(service.vote_event(&user, opened.id, Vote::Great).await.is_ok());
        let voted = service.get_participated_event(&user).await.ok();
        assert_eq!(voted.map(|u| u.vote), Some(Vote::Great));

        let Ok(closed) = service.update_event_status(&owner, EventStatus::Closed).await else {
            panic!("close failed");
        };
        assert_eq!(closed.status, EventStatus::Closed);

        let reopen = service.update_event_status(&owner, EventStatus::Open).await;
        assert!(matches!(reopen, Err(RsvpError::NotFound(_))));
        let stored = service.get_event_by_event_id(registered.id).await.ok();
        assert_eq!(stored.map(|e| e.status), Some(EventStatus::Closed));
    }

    #[tokio::test]
    async fn closing_twice_leaves_event_unchanged() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        let event = open_event(&service, &owner).await;

        let Ok(closed) = service.update_event_status(&owner, EventStatus::Closed).await else {
            panic!("close failed");
        };
        let again = service.update_event_status(&owner, EventStatus::Closed).await;
        assert!(matches!(again, Err(RsvpError::NotFound(_))));

        let stored = service.get_event_by_event_id(event.id).await.ok();
        assert_eq!(stored, Some(closed));
    }

    #[tokio::test]
    async fn backward_transition_is_rejected() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        let event = open_event(&service, &owner).await;

        let result = service.update_event_status(&owner, EventStatus::Standby).await;
        assert!(matches!(
            result,
            Err(RsvpError::IllegalTransition {
                from: EventStatus::Open,
                to: EventStatus::Standby
            })
        ));
        let stored = service.get_event_by_event_id(event.id).await.ok();
        assert_eq!(stored.map(|e| e.status), Some(EventStatus::Open));
    }

    #[tokio::test]
    async fn update_without_event_is_not_found() {
        let service = make_service();
        let result = service
            .update_event_status(&OwnerId::new("nobody"), EventStatus::Open)
            .await;
        assert!(matches!(result, Err(RsvpError::NotFound(_))));
    }

    #[tokio::test]
    async fn second_active_event_for_owner_conflicts() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        assert!(service.register_event(&owner).await.is_ok());

        let second = service.register_event(&owner).await;
        assert!(matches!(second, Err(RsvpError::Conflict(_))));
    }

    #[tokio::test]
    async fn owner_can_host_again_after_closing() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        let first = open_event(&service, &owner).await;
        assert!(service.update_event_status(&owner, EventStatus::Closed).await.is_ok());

        let Ok(second) = service.register_event(&owner).await else {
            panic!("register after close failed");
        };
        assert_ne!(first.id, second.id);
        let active = service.get_event_by_owner_id(&owner, None).await.ok();
        assert_eq!(active.map(|e| e.id), Some(second.id));
    }

    #[tokio::test]
    async fn concurrent_registrations_create_one_event() {
        let service = make_service();
        let owner = OwnerId::new("O1");

        let (a, b, c) = tokio::join!(
            service.register_event(&owner),
            service.register_event(&owner),
            service.register_event(&owner),
        );
        let created = [a, b, c].into_iter().filter(Result::is_ok).count();
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn leave_then_rejoin_restores_participation_and_vote() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        let user = UserId::new("U1");
        let event = open_event(&service, &owner).await;

        assert!(service.participate_event(&user, event.id).await.is_ok());
        assert!(service.vote_event(&user, event.id, Vote::Good).await.is_ok());
        assert!(service.leave_event(&user, event.id).await.is_ok());

        let left = service.get_participation(&user, event.id).await.ok();
        assert_eq!(left.map(|p| p.is_participated), Some(false));
        assert!(service.get_participated_event(&user).await.is_err());

        let rejoined = service.participate_event(&user, event.id).await.ok();
        assert_eq!(rejoined, Some(JoinOutcome::Rejoined));
        let Ok(me) = service.get_participated_event(&user).await else {
            panic!("participation should be active again");
        };
        assert!(me.is_participated);
        assert_eq!(me.vote, Vote::Good);
    }

    #[tokio::test]
    async fn concurrent_joins_insert_once() {
        let service = make_service();
        let owner = OwnerId::new("O1");
        let user = UserId::new("U1");
        let event = open_event(&service, &owner).await;

        let (a, b) = tokio::join!(
            service.participate_event(&user, event.id),
            service.participate_event(&user, event.id),
        );
        let outcomes = [a.ok(), b.ok()];
        assert!(outcomes.contains(&Some(JoinOutcome::Created)));
        assert!(outcomes.contains(&Some(JoinOutcome::Rejoined)));
    }

    #[tokio::test]
    async fn leave_without_participation_is_not_found() {
        let service = make_service();
        let event = open_event(&service, &OwnerId::new("O1")).await;
        let result = service.leave_event(&UserId::new("U1"), event.id).await;
        assert!(matches!(result, Err(RsvpError::NotFound(_))));
    }

    #[tokio::test]
    async fn vote_without_participation_is_not_found() {
        let service = make_service();
        let event = open_event(&service, &OwnerId::new("O1")).await;
        let result = service
            .vote_event(&UserId::new("U1"), event.id, Vote::Bad)
            .await;
        assert!(matches!(result, Err(RsvpError::NotFound(_))));
    }

    #[tokio::test]
    async fn service_does_not_enforce_single_active_participation() {
        // Cross-event exclusivity is the caller's obligation.
        let service = make_service();
        let user = UserId::new("U1");
        let first = open_event(&service, &OwnerId::new("O1")).await;
        let second = open_event(&service, &OwnerId::new("O2")).await;

        assert!(service.participate_event(&user, first.id).await.is_ok());
        assert!(service.participate_event(&user, second.id).await.is_ok());

        let in_first = service.get_participation(&user, first.id).await.ok();
        let in_second = service.get_participation(&user, second.id).await.ok();
        assert_eq!(in_first.map(|p| p.is_participated), Some(true));
        assert_eq!(in_second.map(|p| p.is_participated), Some(true));
    }

    #[tokio::test]
    async fn active_events_lists_only_open() {
        let service = make_service();
        let open = open_event(&service, &OwnerId::new("O1")).await;
        assert!(service.register_event(&OwnerId::new("O2")).await.is_ok());

        let listed = service.get_active_events().await.ok();
        assert_eq!(listed.map(|events| events.into_iter().map(|e| e.id).collect::<Vec<_>>()), Some(vec![open.id]));
    }
}
