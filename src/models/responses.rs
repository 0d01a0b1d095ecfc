use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::CacheStats;
use crate::models::domain::{
    Candidate, ConversationSummary, DeletionReport, LikeOutcome, MessageView, Profile,
};

/// Response for the candidate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CandidateResponse {
    Available { profile: Profile },
    Exhausted,
}

impl From<Candidate> for CandidateResponse {
    fn from(candidate: Candidate) -> Self {
        match candidate {
            Candidate::Available(profile) => CandidateResponse::Available { profile },
            Candidate::Exhausted => CandidateResponse::Exhausted,
        }
    }
}

/// Response for the like endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub matched: bool,
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<Uuid>,
}

impl From<LikeOutcome> for LikeResponse {
    fn from(outcome: LikeOutcome) -> Self {
        Self {
            matched: outcome.is_match(),
            conversation_id: outcome.conversation_id(),
        }
    }
}

/// Response listing a user's conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// Response listing messages in append order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    pub messages: Vec<MessageView>,
    /// Sequence number to pass as `after` on the next poll
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<i64>,
    /// More messages follow `nextCursor` than this page returned
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// Response for administrative user deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(flatten)]
    pub report: DeletionReport,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub cache: CacheStats,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
