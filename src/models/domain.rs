use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directory profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub handle: String,
    #[serde(default)]
    pub bio: String,
    #[serde(rename = "avatarRef", default)]
    pub avatar_ref: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            user_id: self.user_id,
            handle: self.handle.clone(),
            avatar_ref: self.avatar_ref.clone(),
        }
    }
}

/// The slice of a profile needed to render a sender or a chat partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub handle: String,
    #[serde(rename = "avatarRef", default)]
    pub avatar_ref: Option<String>,
}

/// Input for registering a directory profile
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub handle: String,
    pub bio: String,
    pub avatar_ref: Option<String>,
}

/// Directory lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(Uuid),
    Handle(String),
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{}", id),
            UserRef::Handle(handle) => write!(f, "@{}", handle),
        }
    }
}

/// One-directional like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    #[serde(rename = "likerId")]
    pub liker_id: Uuid,
    #[serde(rename = "likeeId")]
    pub likee_id: Uuid,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Unordered pair of distinct users, stored as (low, high)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "[Uuid; 2]", try_from = "[Uuid; 2]")]
pub struct PairKey {
    low: Uuid,
    high: Uuid,
}

impl PairKey {
    /// Returns `None` when both sides are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The other member of the pair, if `user_id` is a member at all.
    pub fn other(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.low {
            Some(self.high)
        } else if user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    /// 64-bit key for `pg_advisory_xact_lock`.
    ///
    /// Collisions only cause unrelated pairs to serialize with each other.
    pub fn lock_key(&self) -> i64 {
        let low = self.low.as_u128();
        let high = self.high.as_u128();
        let folded = (low ^ high.rotate_left(64)) ^ (low >> 64) ^ (high << 32);
        (folded as u64) as i64
    }
}

impl From<PairKey> for [Uuid; 2] {
    fn from(pair: PairKey) -> Self {
        [pair.low, pair.high]
    }
}

impl TryFrom<[Uuid; 2]> for PairKey {
    type Error = String;

    fn try_from(ids: [Uuid; 2]) -> Result<Self, Self::Error> {
        PairKey::new(ids[0], ids[1]).ok_or_else(|| "participants must be distinct".to_string())
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Thread created for a mutually-liking pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "conversationId")]
    pub id: Uuid,
    pub participants: PairKey,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.participants.contains(user_id)
    }
}

/// Stored message; `seq` is the store-assigned append position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub seq: i64,
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    #[serde(rename = "senderId")]
    pub sender_id: Uuid,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Message resolved for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub seq: i64,
    #[serde(rename = "senderId")]
    pub sender_id: Uuid,
    /// Sender handle
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Entry of a user's conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    #[serde(rename = "otherParticipant")]
    pub other_participant: ProfileSummary,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Result of candidate selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Available(Profile),
    /// Every other user has already been liked.
    Exhausted,
}

/// Result of recording a like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Pending,
    Matched { conversation_id: Uuid },
}

impl LikeOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, LikeOutcome::Matched { .. })
    }

    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            LikeOutcome::Matched { conversation_id } => Some(*conversation_id),
            LikeOutcome::Pending => None,
        }
    }
}

/// Read window over a conversation's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCursor {
    /// Only messages with `seq` strictly greater than this
    pub after: Option<i64>,
    /// `None` reads through to the newest message
    pub limit: Option<usize>,
}

impl MessageCursor {
    /// The whole conversation history
    pub fn all() -> Self {
        Self {
            after: None,
            limit: None,
        }
    }

    pub fn page(after: Option<i64>, limit: usize) -> Self {
        Self {
            after,
            limit: Some(limit),
        }
    }

    pub fn after(seq: i64, limit: usize) -> Self {
        Self::page(Some(seq), limit)
    }
}

/// A window of messages and whether newer ones lie beyond it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub has_more: bool,
}

/// What an administrative user deletion removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub likes_removed: u64,
    pub conversations_removed: u64,
}

/// Administrative view over one user's data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivity {
    pub profile: Profile,
    pub likes: Vec<Like>,
    pub conversations: Vec<Conversation>,
}
