//! Applies chat commands to the coordination service.
//!
//! Rules the service leaves to its caller live here: an owner hosting an
//! open event cannot join one, a user takes part in at most one event at a
//! time, and only open events accept participants.

use crate::domain::{EventId, EventStatus, OwnerId, User, UserId, Vote};
use crate::error::RsvpError;
use crate::persistence::Store;
use crate::service::CoordinationService;

use super::command::Command;
use super::reply::Reply;

/// One callback received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The user started following the bot.
    Follow {
        /// Platform user id.
        user_id: String,
    },
    /// The user sent a text message.
    Message {
        /// Platform user id.
        user_id: String,
        /// Message body.
        text: String,
    },
}

/// Turns inbound callbacks into service calls and replies.
#[derive(Debug, Clone)]
pub struct BotHandler<S> {
    service: CoordinationService<S>,
}

impl<S: Store> BotHandler<S> {
    /// Creates a handler over `service`.
    #[must_use]
    pub fn new(service: CoordinationService<S>) -> Self {
        Self { service }
    }

    /// Returns the underlying service.
    #[must_use]
    pub fn service(&self) -> &CoordinationService<S> {
        &self.service
    }

    /// Handles one callback. Storage failures are logged and reported to
    /// the user as [`Reply::Failed`].
    pub async fn handle(&self, inbound: Inbound) -> Reply {
        let (user_id, result) = match inbound {
            Inbound::Follow { user_id } => {
                let user = UserId::new(user_id);
                let result = self
                    .service
                    .follow(&OwnerId::from(user.clone()))
                    .await
                    .map(|_| Reply::Welcome);
                (user, result)
            }
            Inbound::Message { user_id, text } => {
                let user = UserId::new(user_id);
                let result = match Command::parse(&text) {
                    Ok(command) => self.dispatch(&user, command).await,
                    Err(RsvpError::InvalidRequest(reason)) => Ok(Reply::InvalidInput(reason)),
                    Err(e) => Err(e),
                };
                (user, result)
            }
        };

        result.unwrap_or_else(|e| {
            tracing::error!(%user_id, error = %e, "callback failed");
            Reply::Failed
        })
    }

    async fn dispatch(&self, user: &UserId, command: Command) -> Result<Reply, RsvpError> {
        tracing::debug!(%user, ?command, "dispatch");
        let owner = OwnerId::from(user.clone());
        match command {
            Command::Help => Ok(Reply::Help),
            Command::Cancel => Ok(Reply::Cancelled),
            Command::Echo(text) => Ok(Reply::Echo(text)),
            Command::Open => self.open(&owner, user).await,
            Command::Start => self.start(&owner).await,
            Command::Close => self.close(&owner).await,
            Command::Finish => self.finish(&owner).await,
            Command::ListEvents => self.list_events(&owner, user).await,
            Command::Join(event_id) => self.join(&owner, user, event_id).await,
            Command::Leave => self.leave(user).await,
            Command::ShowVotes => self.show_votes(&owner, user).await,
            Command::Voted(vote) => self.voted(&owner, user, vote).await,
        }
    }

    async fn open(&self, owner: &OwnerId, user: &UserId) -> Result<Reply, RsvpError> {
        if self.is_hosting_open_event(owner).await? {
            return Ok(Reply::HostingOpenEvent);
        }
        if self.active_participation(user).await?.is_some() {
            return Ok(Reply::ParticipatingElsewhere);
        }
        match self
            .service
            .get_event_by_owner_id(owner, Some(EventStatus::Standby))
            .await
        {
            Ok(_) => {}
            Err(RsvpError::NotFound(_)) => {
                self.service.register_event(owner).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(Reply::ConfirmStart)
    }

    async fn start(&self, owner: &OwnerId) -> Result<Reply, RsvpError> {
        if self.is_hosting_open_event(owner).await? {
            return Ok(Reply::HostingOpenEvent);
        }
        match self.service.update_event_status(owner, EventStatus::Open).await {
            Ok(event) => Ok(Reply::EventStarted(event.id)),
            Err(RsvpError::NotFound(_)) => Ok(Reply::NothingToStart),
            Err(e) => Err(e),
        }
    }

    async fn close(&self, owner: &OwnerId) -> Result<Reply, RsvpError> {
        if !self.is_hosting_open_event(owner).await? {
            return Ok(Reply::NotHosting);
        }
        Ok(Reply::ConfirmFinish)
    }

    async fn finish(&self, owner: &OwnerId) -> Result<Reply, RsvpError> {
        if !self.is_hosting_open_event(owner).await? {
            return Ok(Reply::NotHosting);
        }
        match self.service.update_event_status(owner, EventStatus::Closed).await {
            Ok(_) => Ok(Reply::EventFinished),
            // Closed by a concurrent `finish`.
            Err(RsvpError::NotFound(_) | RsvpError::AlreadyClosed(_)) => Ok(Reply::NotHosting),
            Err(e) => Err(e),
        }
    }

    async fn list_events(&self, owner: &OwnerId, user: &UserId) -> Result<Reply, RsvpError> {
        if self.is_hosting_open_event(owner).await? {
            return Ok(Reply::HostingOpenEvent);
        }
        if self.active_participation(user).await?.is_some() {
            return Ok(Reply::ParticipatingElsewhere);
        }
        let events = self.service.get_active_events().await?;
        if events.is_empty() {
            return Ok(Reply::NoOpenEvents);
        }
        Ok(Reply::OpenEvents(events.into_iter().map(|e| e.id).collect()))
    }

    async fn join(
        &self,
        owner: &OwnerId,
        user: &UserId,
        event_id: EventId,
    ) -> Result<Reply, RsvpError> {
        if self.is_hosting_open_event(owner).await? {
            return Ok(Reply::HostingOpenEvent);
        }
        let event = match self.service.get_event_by_event_id(event_id).await {
            Ok(event) => event,
            Err(RsvpError::NotFound(_)) => return Ok(Reply::UnknownEvent),
            Err(e) => return Err(e),
        };
        match event.status {
            EventStatus::Standby => return Ok(Reply::EventNotStarted),
            EventStatus::Closed => return Ok(Reply::EventAlreadyClosed),
            EventStatus::Open => {}
        }
        match self.active_participation(user).await? {
            Some(current) if current.event_id == event.id => return Ok(Reply::AlreadyJoined),
            Some(_) => return Ok(Reply::ParticipatingElsewhere),
            None => {}
        }
        match self.service.participate_event(user, event.id).await {
            Ok(_) => Ok(Reply::Joined(event.id)),
            Err(RsvpError::NotFound(_)) => Ok(Reply::UnknownEvent),
            Err(e) => Err(e),
        }
    }

    async fn leave(&self, user: &UserId) -> Result<Reply, RsvpError> {
        let Some(current) = self.active_participation(user).await? else {
            return Ok(Reply::NotParticipating);
        };
        match self.service.leave_event(user, current.event_id).await {
            Ok(()) => Ok(Reply::Left),
            Err(RsvpError::NotFound(_)) => Ok(Reply::NotParticipating),
            Err(e) => Err(e),
        }
    }

    async fn show_votes(&self, owner: &OwnerId, user: &UserId) -> Result<Reply, RsvpError> {
        if self.is_hosting_open_event(owner).await? {
            return Ok(Reply::HostingOpenEvent);
        }
        if self.active_participation(user).await?.is_none() {
            return Ok(Reply::NotParticipating);
        }
        Ok(Reply::VoteChoices)
    }

    async fn voted(&self, owner: &OwnerId, user: &UserId, vote: Vote) -> Result<Reply, RsvpError> {
        if self.is_hosting_open_event(owner).await? {
            return Ok(Reply::HostingOpenEvent);
        }
        let Some(current) = self.active_participation(user).await? else {
            return Ok(Reply::NotParticipating);
        };
        match self.service.vote_event(user, current.event_id, vote).await {
            Ok(()) => Ok(Reply::Voted(vote)),
            Err(RsvpError::NotFound(_)) => Ok(Reply::NotParticipating),
            Err(e) => Err(e),
        }
    }

    async fn is_hosting_open_event(&self, owner: &OwnerId) -> Result<bool, RsvpError> {
        match self
            .service
            .get_event_by_owner_id(owner, Some(EventStatus::Open))
            .await
        {
            Ok(_) => Ok(true),
            Err(RsvpError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn active_participation(&self, user: &UserId) -> Result<Option<User>, RsvpError> {
        match self.service.get_participated_event(user).await {
            Ok(current) => Ok(Some(current)),
            Err(RsvpError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::OwnerRepository;
    use crate::persistence::memory::MemoryStore;

    fn make_handler() -> BotHandler<MemoryStore> {
        BotHandler::new(CoordinationService::new(MemoryStore::new()))
    }

    async fn say(handler: &BotHandler<MemoryStore>, user: &str, text: &str) -> Reply {
        handler
            .handle(Inbound::Message {
                user_id: user.to_string(),
                text: text.to_string(),
            })
            .await
    }

    async fn host_open_event(handler: &BotHandler<MemoryStore>, host: &str) -> EventId {
        assert_eq!(say(handler, host, "open").await, Reply::ConfirmStart);
        let Reply::EventStarted(id) = say(handler, host, "start").await else {
            panic!("event did not start");
        };
        id
    }

    #[tokio::test]
    async fn follow_welcomes_and_registers_owner() {
        let handler = make_handler();
        let reply = handler
            .handle(Inbound::Follow {
                user_id: "O1".to_string(),
            })
            .await;
        assert_eq!(reply, Reply::Welcome);
        assert!(handler.service().store().get_owner(&OwnerId::new("O1")).await.is_ok());
    }

    #[tokio::test]
    async fn host_and_participant_round_trip() {
        let handler = make_handler();
        let event_id = host_open_event(&handler, "O1").await;

        assert_eq!(say(&handler, "U1", "join").await, Reply::OpenEvents(vec![event_id]));
        assert_eq!(
            say(&handler, "U1", &format!("join {event_id}")).await,
            Reply::Joined(event_id)
        );
        assert_eq!(say(&handler, "U1", "vote").await, Reply::VoteChoices);
        assert_eq!(say(&handler, "U1", "voted 2").await, Reply::Voted(Vote::Good));

        assert_eq!(say(&handler, "O1", "close").await, Reply::ConfirmFinish);
        assert_eq!(say(&handler, "O1", "finish").await, Reply::EventFinished);
        assert_eq!(say(&handler, "O1", "finish").await, Reply::NotHosting);
    }

    #[tokio::test]
    async fn open_twice_reuses_standby_event() {
        let handler = make_handler();
        assert_eq!(say(&handler, "O1", "open").await, Reply::ConfirmStart);
        assert_eq!(say(&handler, "O1", "open").await, Reply::ConfirmStart);
        assert!(matches!(say(&handler, "O1", "start").await, Reply::EventStarted(_)));
        assert_eq!(say(&handler, "O1", "open").await, Reply::HostingOpenEvent);
    }

    #[tokio::test]
    async fn start_without_standby_event() {
        let handler = make_handler();
        assert_eq!(say(&handler, "O1", "start").await, Reply::NothingToStart);
    }

    #[tokio::test]
    async fn joining_a_second_event_is_rejected() {
        let handler = make_handler();
        let first = host_open_event(&handler, "O1").await;
        let second = host_open_event(&handler, "O2").await;

        assert_eq!(say(&handler, "U1", &format!("join {first}")).await, Reply::Joined(first));
        assert_eq!(
            say(&handler, "U1", &format!("join {second}")).await,
            Reply::ParticipatingElsewhere
        );
        assert_eq!(
            say(&handler, "U1", &format!("join {first}")).await,
            Reply::AlreadyJoined
        );
        assert_eq!(say(&handler, "U1", "join").await, Reply::ParticipatingElsewhere);

        let in_second = handler
            .service()
            .get_participation(&UserId::new("U1"), second)
            .await;
        assert!(matches!(in_second, Err(RsvpError::NotFound(_))));
    }

    #[tokio::test]
    async fn leave_frees_the_user_to_join_elsewhere() {
        let handler = make_handler();
        let first = host_open_event(&handler, "O1").await;
        let second = host_open_event(&handler, "O2").await;

        assert_eq!(say(&handler, "U1", &format!("join {first}")).await, Reply::Joined(first));
        assert_eq!(say(&handler, "U1", "leave").await, Reply::Left);
        assert_eq!(say(&handler, "U1", "leave").await, Reply::NotParticipating);
        assert_eq!(
            say(&handler, "U1", &format!("join {second}")).await,
            Reply::Joined(second)
        );
    }

    #[tokio::test]
    async fn only_open_events_accept_participants() {
        let handler = make_handler();
        assert_eq!(say(&handler, "O1", "open").await, Reply::ConfirmStart);
        let Ok(standby) = handler
            .service()
            .get_event_by_owner_id(&OwnerId::new("O1"), None)
            .await
        else {
            panic!("standby event missing");
        };
        assert_eq!(
            say(&handler, "U1", &format!("join {}", standby.id)).await,
            Reply::EventNotStarted
        );

        assert!(matches!(say(&handler, "O1", "start").await, Reply::EventStarted(_)));
        assert_eq!(say(&handler, "O1", "finish").await, Reply::EventFinished);
        assert_eq!(
            say(&handler, "U1", &format!("join {}", standby.id)).await,
            Reply::EventAlreadyClosed
        );
        assert_eq!(
            say(&handler, "U1", &format!("join {}", EventId::new())).await,
            Reply::UnknownEvent
        );
    }

    #[tokio::test]
    async fn host_of_open_event_cannot_participate() {
        let handler = make_handler();
        let other = host_open_event(&handler, "O2").await;
        host_open_event(&handler, "O1").await;

        assert_eq!(
            say(&handler, "O1", &format!("join {other}")).await,
            Reply::HostingOpenEvent
        );
        assert_eq!(say(&handler, "O1", "vote").await, Reply::HostingOpenEvent);
    }

    #[tokio::test]
    async fn participant_cannot_open_an_event() {
        let handler = make_handler();
        let event_id = host_open_event(&handler, "O1").await;
        assert_eq!(say(&handler, "U1", &format!("join {event_id}")).await, Reply::Joined(event_id));
        assert_eq!(say(&handler, "U1", "open").await, Reply::ParticipatingElsewhere);
    }

    #[tokio::test]
    async fn vote_requires_participation() {
        let handler = make_handler();
        host_open_event(&handler, "O1").await;
        assert_eq!(say(&handler, "U1", "vote").await, Reply::NotParticipating);
        assert_eq!(say(&handler, "U1", "voted 1").await, Reply::NotParticipating);
    }

    #[tokio::test]
    async fn malformed_arguments_and_chatter() {
        let handler = make_handler();
        assert!(matches!(say(&handler, "U1", "voted 9").await, Reply::InvalidInput(_)));
        assert!(matches!(say(&handler, "U1", "join xyz").await, Reply::InvalidInput(_)));
        assert_eq!(say(&handler, "U1", "hello").await, Reply::Echo("hello".to_string()));
        assert_eq!(say(&handler, "U1", "cancel").await, Reply::Cancelled);
        assert_eq!(say(&handler, "U1", "help").await, Reply::Help);
    }
}
