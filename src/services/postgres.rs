use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    Conversation, DeletionReport, Like, LikeOutcome, Message, MessageCursor, NewProfile, PairKey,
    Profile, UserRef,
};
use crate::services::store::{MatchStore, StoreError};

/// PostgreSQL-backed store for profiles, likes, conversations and messages
///
/// Uniqueness is enforced by the schema (see `migrations/`): the likes
/// primary key covers the ordered pair and conversations carry a unique
/// `(user_low, user_high)` key. Like/match checks for one pair are
/// serialized with a transaction-scoped advisory lock.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn profile_from_row(row: &PgRow) -> Profile {
    Profile {
        user_id: row.get("id"),
        handle: row.get("handle"),
        bio: row.get("bio"),
        avatar_ref: row.get("avatar_ref"),
        created_at: row.get("created_at"),
    }
}

fn conversation_from_row(row: &PgRow) -> Result<Conversation, StoreError> {
    let low: Uuid = row.get("user_low");
    let high: Uuid = row.get("user_high");
    let participants = PairKey::new(low, high).ok_or(StoreError::SelfReference)?;

    Ok(Conversation {
        id: row.get("id"),
        participants,
        created_at: row.get("created_at"),
    })
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        seq: row.get("seq"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn create_user(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let query = r#"
            INSERT INTO users (id, handle, bio, avatar_ref, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (handle) DO NOTHING
            RETURNING id, handle, bio, avatar_ref, created_at
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&profile.handle)
            .bind(&profile.bio)
            .bind(&profile.avatar_ref)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let created = profile_from_row(&row);
                tracing::debug!("Created profile {} ({})", created.handle, created.user_id);
                Ok(created)
            }
            None => Err(StoreError::DuplicateHandle(profile.handle)),
        }
    }

    async fn find_user(&self, user: &UserRef) -> Result<Option<Profile>, StoreError> {
        let row = match user {
            UserRef::Id(id) => {
                sqlx::query(
                    "SELECT id, handle, bio, avatar_ref, created_at FROM users WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            UserRef::Handle(handle) => {
                sqlx::query(
                    "SELECT id, handle, bio, avatar_ref, created_at FROM users WHERE handle = $1",
                )
                .bind(handle)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn list_users(&self) -> Result<Vec<Profile>, StoreError> {
        let query = r#"
            SELECT id, handle, bio, avatar_ref, created_at
            FROM users
            ORDER BY created_at, handle
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn random_unliked_candidate(
        &self,
        requester: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(requester)
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Err(StoreError::NotFound(format!("user {}", requester)));
        }

        // Single set-difference query; terminates regardless of how many are excluded
        let query = r#"
            SELECT u.id, u.handle, u.bio, u.avatar_ref, u.created_at
            FROM users u
            WHERE u.id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM likes l
                  WHERE l.liker_id = $1 AND l.likee_id = u.id
              )
            ORDER BY random()
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn record_like(&self, liker: Uuid, likee: Uuid) -> Result<LikeOutcome, StoreError> {
        let pair = PairKey::new(liker, likee).ok_or(StoreError::SelfReference)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(pair.lock_key())
            .execute(&mut *tx)
            .await?;

        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 OR id = $2")
            .bind(liker)
            .bind(likee)
            .fetch_all(&mut *tx)
            .await?;

        for id in [liker, likee] {
            if !found.contains(&id) {
                return Err(StoreError::NotFound(format!("user {}", id)));
            }
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO likes (liker_id, likee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (liker_id, likee_id) DO NOTHING
            "#,
        )
        .bind(liker)
        .bind(likee)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::DuplicateLike);
        }

        let reciprocal: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE liker_id = $1 AND likee_id = $2)",
        )
        .bind(likee)
        .bind(liker)
        .fetch_one(&mut *tx)
        .await?;

        if !reciprocal {
            tx.commit().await?;
            tracing::debug!("Recorded like {} -> {}", liker, likee);
            return Ok(LikeOutcome::Pending);
        }

        let created: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO conversations (id, user_low, user_high, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_low, user_high) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&mut *tx)
        .await?;

        let conversation_id = match created {
            Some(id) => id,
            None => {
                tracing::debug!("Conversation for pair {} already exists", pair);
                sqlx::query_scalar(
                    "SELECT id FROM conversations WHERE user_low = $1 AND user_high = $2",
                )
                .bind(pair.low())
                .bind(pair.high())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(LikeOutcome::Matched { conversation_id })
    }

    async fn likes_by(&self, liker: Uuid) -> Result<Vec<Like>, StoreError> {
        let query = r#"
            SELECT liker_id, likee_id, created_at
            FROM likes
            WHERE liker_id = $1
            ORDER BY created_at, likee_id
        "#;

        let rows = sqlx::query(query).bind(liker).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| Like {
                liker_id: row.get("liker_id"),
                likee_id: row.get("likee_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_low, user_high, created_at FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        let query = r#"
            SELECT id, user_low, user_high, created_at
            FROM conversations
            WHERE user_low = $1 OR user_high = $1
            ORDER BY created_at, id
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        rows.iter().map(conversation_from_row).collect()
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes appends per conversation so seq order is commit order.
        // It also holds off a concurrent user deletion until the append commits.
        let row = sqlx::query(
            r#"
            SELECT id, user_low, user_high, created_at
            FROM conversations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("conversation {}", conversation_id)))?;

        let conversation = conversation_from_row(&row)?;
        if !conversation.includes(sender_id) {
            return Err(StoreError::Forbidden(format!(
                "user {} is not a participant of conversation {}",
                sender_id, conversation_id
            )));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING seq, conversation_id, sender_id, content, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message_from_row(&row))
    }

    async fn messages(
        &self,
        conversation_id: Uuid,
        cursor: MessageCursor,
    ) -> Result<Vec<Message>, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Err(StoreError::NotFound(format!(
                "conversation {}",
                conversation_id
            )));
        }

        let query = r#"
            SELECT seq, conversation_id, sender_id, content, created_at
            FROM messages
            WHERE conversation_id = $1 AND seq > $2
            ORDER BY seq
            LIMIT $3
        "#;

        let rows = sqlx::query(query)
            .bind(conversation_id)
            .bind(cursor.after.unwrap_or(0))
            // LIMIT NULL is LIMIT ALL
            .bind(cursor.limit.map(|limit| limit as i64))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<DeletionReport, StoreError> {
        let mut tx = self.pool.begin().await?;

        let likes = sqlx::query("DELETE FROM likes WHERE liker_id = $1 OR likee_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Messages go with their conversation via ON DELETE CASCADE
        let conversations =
            sqlx::query("DELETE FROM conversations WHERE user_low = $1 OR user_high = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

        let user = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if user.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }

        tx.commit().await?;

        let report = DeletionReport {
            likes_removed: likes.rows_affected(),
            conversations_removed: conversations.rows_affected(),
        };

        tracing::info!(
            "Deleted user {} ({} likes, {} conversations)",
            user_id,
            report.likes_removed,
            report.conversations_removed
        );

        Ok(report)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
