use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to like a candidate; the liker is the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRequest {
    #[serde(alias = "likee_id", rename = "likeeId")]
    pub likee_id: Uuid,
}

/// Request to append a message to a conversation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    pub content: String,
}

/// Query parameters for reading messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    /// Return only messages appended after this sequence number
    #[serde(default)]
    pub after: Option<i64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request to register a directory profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 32))]
    pub handle: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub bio: String,
    #[serde(alias = "avatar_ref", rename = "avatarRef", default)]
    pub avatar_ref: Option<String>,
}
