use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Conversation, DeletionReport, Like, LikeOutcome, Message, MessageCursor, NewProfile, Profile,
    UserRef,
};

/// Failures returned at the store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User has already been liked")]
    DuplicateLike,

    #[error("Users cannot like themselves")]
    SelfReference,

    #[error("Handle already taken: {0}")]
    DuplicateHandle(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transient; the caller may retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLx error: {0}")]
    SqlxError(sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Whether the caller may retry the same request unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound("referenced user or conversation".to_string())
            }
            sqlx::Error::Database(db) if db.is_check_violation() => StoreError::SelfReference,
            _ => StoreError::SqlxError(err),
        }
    }
}

/// Shared persistent state behind the match and conversation engine.
///
/// Every mutating operation is atomic: it either applies completely or
/// leaves the store unchanged. Implementations enforce the uniqueness
/// constraints themselves rather than relying on callers.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Register a directory profile. Fails with `DuplicateHandle`.
    async fn create_user(&self, profile: NewProfile) -> Result<Profile, StoreError>;

    async fn find_user(&self, user: &UserRef) -> Result<Option<Profile>, StoreError>;

    /// All profiles, oldest first.
    async fn list_users(&self) -> Result<Vec<Profile>, StoreError>;

    /// One random profile that is neither `requester` nor already liked by them.
    async fn random_unliked_candidate(&self, requester: Uuid)
        -> Result<Option<Profile>, StoreError>;

    /// Record `liker -> likee` and, if the reverse like exists, create the
    /// pair's conversation. Serialized per unordered pair.
    async fn record_like(&self, liker: Uuid, likee: Uuid) -> Result<LikeOutcome, StoreError>;

    /// Outgoing likes of a user, oldest first.
    async fn likes_by(&self, liker: Uuid) -> Result<Vec<Like>, StoreError>;

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError>;

    /// Conversations the user participates in, oldest first.
    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError>;

    /// Append after verifying the sender is a participant.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// Messages in append order within the cursor window.
    async fn messages(
        &self,
        conversation_id: Uuid,
        cursor: MessageCursor,
    ) -> Result<Vec<Message>, StoreError>;

    /// Remove a user with every like and conversation referencing them.
    async fn delete_user(&self, user_id: Uuid) -> Result<DeletionReport, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
