//! PostgreSQL implementation of the persistence gateway.

use std::fmt;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{
    EventRow, OwnerRow, ParticipationRow, UserRow, event_from_row, owner_from_row,
    participation_from_row, user_from_row,
};
use super::{
    Database, EventRepository, JoinOutcome, OwnerRepository, ParticipationRepository,
    Transaction, WriteOutcome,
};
use crate::config::RsvpConfig;
use crate::domain::{
    Event, EventId, EventStatus, Owner, OwnerId, Participation, User, UserId, Vote, VoteRecord,
};
use crate::error::RsvpError;

const EVENT_COLUMNS: &str = "event_id, owner_id, status, created_at, updated_at";

/// PostgreSQL-backed store using one `sqlx::PgPool` for writes and
/// another (possibly the same) for reads.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    primary: PgPool,
    replica: PgPool,
}

impl PostgresStore {
    /// Creates a store that reads and writes through the same pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            replica: pool.clone(),
            primary: pool,
        }
    }

    /// Creates a store with a separate read pool.
    #[must_use]
    pub fn with_replica(primary: PgPool, replica: PgPool) -> Self {
        Self { primary, replica }
    }

    /// Connects the primary and, when configured, the replica pool.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if a pool cannot connect.
    pub async fn connect(config: &RsvpConfig) -> Result<Self, RsvpError> {
        let primary = pool_options(config).connect(&config.database_url).await?;
        let replica = match &config.database_replica_url {
            Some(url) => pool_options(config).connect(url).await?,
            None => primary.clone(),
        };
        tracing::info!(
            replica = config.database_replica_url.is_some(),
            "connected to postgres"
        );
        Ok(Self::with_replica(primary, replica))
    }

    /// Applies the bundled schema migrations on the primary.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RsvpError> {
        sqlx::migrate!("./migrations").run(&self.primary).await?;
        Ok(())
    }
}

fn pool_options(config: &RsvpConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
}

/// Transaction on the primary pool. Rolled back by `sqlx` when dropped
/// without a commit.
pub struct PgTransaction(sqlx::Transaction<'static, sqlx::Postgres>);

impl fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgTransaction").finish_non_exhaustive()
    }
}

impl Transaction for PgTransaction {
    async fn commit(self) -> Result<(), RsvpError> {
        self.0.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RsvpError> {
        self.0.rollback().await?;
        Ok(())
    }
}

impl Database for PostgresStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, RsvpError> {
        Ok(PgTransaction(self.primary.begin().await?))
    }
}

impl OwnerRepository for PostgresStore {
    async fn create_owner(&self, tx: &mut PgTransaction, owner: &Owner) -> Result<(), RsvpError> {
        tracing::debug!(owner_id = %owner.id, "insert owner");
        sqlx::query("INSERT INTO owners (owner_id, created_at, updated_at) VALUES ($1, $2, $3)")
            .bind(owner.id.as_str())
            .bind(owner.created_at)
            .bind(owner.updated_at)
            .execute(&mut *tx.0)
            .await?;
        Ok(())
    }

    async fn get_owner(&self, owner_id: &OwnerId) -> Result<Owner, RsvpError> {
        sqlx::query_as::<_, OwnerRow>(
            "SELECT owner_id, created_at, updated_at FROM owners WHERE owner_id = $1",
        )
        .bind(owner_id.as_str())
        .fetch_optional(&self.replica)
        .await?
        .map(owner_from_row)
        .ok_or_else(|| RsvpError::NotFound(format!("owner {owner_id}")))
    }
}

impl EventRepository for PostgresStore {
    async fn create_event(&self, tx: &mut PgTransaction, event: &Event) -> Result<(), RsvpError> {
        tracing::debug!(event_id = %event.id, owner_id = %event.owner_id, "insert event");
        sqlx::query("INSERT INTO events (event_id, created_at, updated_at) VALUES ($1, $2, $3)")
            .bind(event.id.as_uuid())
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&mut *tx.0)
            .await?;

        // Partial unique index on owner_id rejects a second non-closed event.
        sqlx::query(
            "INSERT INTO event_statuses (event_id, owner_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event.id.as_uuid())
        .bind(event.owner_id.as_str())
        .bind(event.status.as_i16())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx.0)
        .await?;
        Ok(())
    }

    async fn update_event_status(
        &self,
        tx: &mut PgTransaction,
        event: &Event,
    ) -> Result<WriteOutcome, RsvpError> {
        tracing::debug!(event_id = %event.id, status = ?event.status, "update event status");
        let result = sqlx::query(
            "UPDATE event_statuses \
             SET status = $3, updated_at = GREATEST(updated_at, $4) \
             WHERE event_id = $1 AND owner_id = $2 AND status <> $5",
        )
        .bind(event.id.as_uuid())
        .bind(event.owner_id.as_str())
        .bind(event.status.as_i16())
        .bind(event.updated_at)
        .bind(EventStatus::Closed.as_i16())
        .execute(&mut *tx.0)
        .await?;

        if result.rows_affected() == 0 {
            let current = sqlx::query_scalar::<_, i16>(
                "SELECT status FROM event_statuses WHERE event_id = $1 AND owner_id = $2",
            )
            .bind(event.id.as_uuid())
            .bind(event.owner_id.as_str())
            .fetch_optional(&mut *tx.0)
            .await?;
            return Ok(match current.map(EventStatus::try_from).transpose()? {
                Some(status) if status.is_terminal() => WriteOutcome::AlreadyTerminal,
                _ => WriteOutcome::NotFound,
            });
        }

        sqlx::query("UPDATE events SET updated_at = GREATEST(updated_at, $2) WHERE event_id = $1")
            .bind(event.id.as_uuid())
            .bind(event.updated_at)
            .execute(&mut *tx.0)
            .await?;
        Ok(WriteOutcome::Updated)
    }

    async fn find_active_event_for_update(
        &self,
        tx: &mut PgTransaction,
        owner_id: &OwnerId,
    ) -> Result<Option<Event>, RsvpError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM event_statuses \
             WHERE owner_id = $1 AND status <> $2 \
             ORDER BY created_at DESC LIMIT 1 FOR UPDATE"
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner_id.as_str())
            .bind(EventStatus::Closed.as_i16())
            .fetch_optional(&mut *tx.0)
            .await?
            .map(event_from_row)
            .transpose()
    }

    async fn get_event_by_owner(
        &self,
        owner_id: &OwnerId,
        status: Option<EventStatus>,
    ) -> Result<Event, RsvpError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM event_statuses \
             WHERE owner_id = $1 AND status <> $2 AND ($3::SMALLINT IS NULL OR status = $3) \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner_id.as_str())
            .bind(EventStatus::Closed.as_i16())
            .bind(status.map(EventStatus::as_i16))
            .fetch_optional(&self.replica)
            .await?
            .ok_or_else(|| RsvpError::NotFound(format!("no active event for owner {owner_id}")))?;
        event_from_row(row)
    }

    async fn get_event_by_id(&self, event_id: EventId) -> Result<Event, RsvpError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM event_statuses WHERE event_id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id.as_uuid())
            .fetch_optional(&self.replica)
            .await?
            .ok_or_else(|| RsvpError::NotFound(format!("event {event_id}")))?;
        event_from_row(row)
    }

    async fn list_events(&self, status: EventStatus) -> Result<Vec<Event>, RsvpError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM event_statuses WHERE status = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(status.as_i16())
            .fetch_all(&self.replica)
            .await?
            .into_iter()
            .map(event_from_row)
            .collect()
    }
}

impl ParticipationRepository for PostgresStore {
    async fn create_participation(
        &self,
        tx: &mut PgTransaction,
        participation: &Participation,
    ) -> Result<JoinOutcome, RsvpError> {
        tracing::debug!(
            user_id = %participation.user_id,
            event_id = %participation.event_id,
            "upsert participation"
        );
        // xmax = 0 only for freshly inserted tuples.
        let inserted = sqlx::query_scalar::<_, bool>(
            "INSERT INTO event_participants \
                 (event_id, user_id, is_participated, created_at, updated_at) \
             VALUES ($1, $2, TRUE, $3, $4) \
             ON CONFLICT (event_id, user_id) DO UPDATE \
             SET is_participated = TRUE, \
                 updated_at = GREATEST(event_participants.updated_at, EXCLUDED.updated_at) \
             RETURNING (xmax = 0)",
        )
        .bind(participation.event_id.as_uuid())
        .bind(participation.user_id.as_str())
        .bind(participation.created_at)
        .bind(participation.updated_at)
        .fetch_one(&mut *tx.0)
        .await?;

        sqlx::query(
            "INSERT INTO event_votes (event_id, user_id, vote, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (event_id, user_id) DO NOTHING",
        )
        .bind(participation.event_id.as_uuid())
        .bind(participation.user_id.as_str())
        .bind(Vote::NotVoted.as_i16())
        .bind(participation.created_at)
        .bind(participation.updated_at)
        .execute(&mut *tx.0)
        .await?;

        Ok(if inserted {
            JoinOutcome::Created
        } else {
            JoinOutcome::Rejoined
        })
    }

    async fn update_participation(
        &self,
        tx: &mut PgTransaction,
        participation: &Participation,
    ) -> Result<WriteOutcome, RsvpError> {
        tracing::debug!(
            user_id = %participation.user_id,
            event_id = %participation.event_id,
            is_participated = participation.is_participated,
            "update participation"
        );
        let result = sqlx::query(
            "UPDATE event_participants \
             SET is_participated = $3, updated_at = GREATEST(updated_at, $4) \
             WHERE event_id = $1 AND user_id = $2",
        )
        .bind(participation.event_id.as_uuid())
        .bind(participation.user_id.as_str())
        .bind(participation.is_participated)
        .bind(participation.updated_at)
        .execute(&mut *tx.0)
        .await?;
        Ok(outcome(result.rows_affected()))
    }

    async fn vote(&self, tx: &mut PgTransaction, record: &VoteRecord) -> Result<WriteOutcome, RsvpError> {
        tracing::debug!(
            user_id = %record.user_id,
            event_id = %record.event_id,
            vote = ?record.vote,
            "update vote"
        );
        let result = sqlx::query(
            "UPDATE event_votes SET vote = $3, updated_at = GREATEST(updated_at, $4) \
             WHERE event_id = $1 AND user_id = $2",
        )
        .bind(record.event_id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(record.vote.as_i16())
        .bind(record.updated_at)
        .execute(&mut *tx.0)
        .await?;
        Ok(outcome(result.rows_affected()))
    }

    async fn get_participation(
        &self,
        user_id: &UserId,
        event_id: EventId,
    ) -> Result<Participation, RsvpError> {
        sqlx::query_as::<_, ParticipationRow>(
            "SELECT user_id, event_id, is_participated, created_at, updated_at \
             FROM event_participants WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id.as_str())
        .bind(event_id.as_uuid())
        .fetch_optional(&self.replica)
        .await?
        .map(participation_from_row)
        .ok_or_else(|| RsvpError::NotFound(format!("user {user_id} has not joined {event_id}")))
    }

    async fn get_participation_by_user_and_status(
        &self,
        user_id: &UserId,
        is_participated: bool,
    ) -> Result<User, RsvpError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT p.user_id, p.event_id, p.is_participated, v.vote, p.created_at, p.updated_at \
             FROM event_participants p \
             JOIN event_votes v ON v.event_id = p.event_id AND v.user_id = p.user_id \
             WHERE p.user_id = $1 AND p.is_participated = $2 \
             ORDER BY p.updated_at DESC LIMIT 1",
        )
        .bind(user_id.as_str())
        .bind(is_participated)
        .fetch_optional(&self.replica)
        .await?
        .ok_or_else(|| RsvpError::NotFound(format!("no participation for user {user_id}")))?;
        user_from_row(row)
    }
}

fn outcome(rows_affected: u64) -> WriteOutcome {
    if rows_affected == 0 {
        WriteOutcome::NotFound
    } else {
        WriteOutcome::Updated
    }
}
