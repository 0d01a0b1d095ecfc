use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Conversation, DeletionReport, Like, LikeOutcome, Message, MessageCursor, NewProfile, PairKey,
    Profile, UserRef,
};
use crate::services::store::{MatchStore, StoreError};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, Profile>,
    handles: HashMap<String, Uuid>,
    likes: HashMap<(Uuid, Uuid), Like>,
    conversations: HashMap<Uuid, Conversation>,
    pairs: HashMap<PairKey, Uuid>,
    messages: HashMap<Uuid, Vec<Message>>,
    next_seq: i64,
}

impl MemoryState {
    fn require_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {}", user_id)))
        }
    }
}

/// In-process store with the same guarantees as the Postgres store.
///
/// Each operation runs inside a single lock critical section, which makes
/// it atomic and serializes like/match checks for every pair.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_user(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let mut state = self.state.write().await;

        if state.handles.contains_key(&profile.handle) {
            return Err(StoreError::DuplicateHandle(profile.handle));
        }

        let created = Profile {
            user_id: Uuid::new_v4(),
            handle: profile.handle,
            bio: profile.bio,
            avatar_ref: profile.avatar_ref,
            created_at: Utc::now(),
        };

        state.handles.insert(created.handle.clone(), created.user_id);
        state.users.insert(created.user_id, created.clone());

        Ok(created)
    }

    async fn find_user(&self, user: &UserRef) -> Result<Option<Profile>, StoreError> {
        let state = self.state.read().await;

        let id = match user {
            UserRef::Id(id) => Some(*id),
            UserRef::Handle(handle) => state.handles.get(handle).copied(),
        };

        Ok(id.and_then(|id| state.users.get(&id).cloned()))
    }

    async fn list_users(&self) -> Result<Vec<Profile>, StoreError> {
        let state = self.state.read().await;

        let mut users: Vec<Profile> = state.users.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.handle.cmp(&b.handle))
        });

        Ok(users)
    }

    async fn random_unliked_candidate(
        &self,
        requester: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        let state = self.state.read().await;
        state.require_user(requester)?;

        // Set difference: everyone minus self minus already liked
        let pool: Vec<&Profile> = state
            .users
            .values()
            .filter(|p| p.user_id != requester)
            .filter(|p| !state.likes.contains_key(&(requester, p.user_id)))
            .collect();

        let picked = pool.choose(&mut rand::thread_rng()).map(|p| (*p).clone());

        Ok(picked)
    }

    async fn record_like(&self, liker: Uuid, likee: Uuid) -> Result<LikeOutcome, StoreError> {
        let pair = PairKey::new(liker, likee).ok_or(StoreError::SelfReference)?;

        let mut state = self.state.write().await;
        state.require_user(liker)?;
        state.require_user(likee)?;

        if state.likes.contains_key(&(liker, likee)) {
            return Err(StoreError::DuplicateLike);
        }

        let now = Utc::now();
        state.likes.insert(
            (liker, likee),
            Like {
                liker_id: liker,
                likee_id: likee,
                created_at: now,
            },
        );

        if !state.likes.contains_key(&(likee, liker)) {
            return Ok(LikeOutcome::Pending);
        }

        if let Some(existing) = state.pairs.get(&pair) {
            tracing::debug!("Conversation for pair {} already exists", pair);
            return Ok(LikeOutcome::Matched {
                conversation_id: *existing,
            });
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            participants: pair,
            created_at: now,
        };
        let conversation_id = conversation.id;

        state.pairs.insert(pair, conversation_id);
        state.messages.insert(conversation_id, Vec::new());
        state.conversations.insert(conversation_id, conversation);

        Ok(LikeOutcome::Matched { conversation_id })
    }

    async fn likes_by(&self, liker: Uuid) -> Result<Vec<Like>, StoreError> {
        let state = self.state.read().await;

        let mut likes: Vec<Like> = state
            .likes
            .values()
            .filter(|like| like.liker_id == liker)
            .cloned()
            .collect();
        likes.sort_by_key(|like| (like.created_at, like.likee_id));

        Ok(likes)
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError> {
        let state = self.state.read().await;
        Ok(state.conversations.get(&id).cloned())
    }

    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        let state = self.state.read().await;

        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.includes(user_id))
            .cloned()
            .collect();
        conversations.sort_by_key(|c| (c.created_at, c.id));

        Ok(conversations)
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut state = self.state.write().await;

        let conversation = state
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {}", conversation_id)))?;

        if !conversation.includes(sender_id) {
            return Err(StoreError::Forbidden(format!(
                "user {} is not a participant of conversation {}",
                sender_id, conversation_id
            )));
        }

        state.next_seq += 1;
        let message = Message {
            seq: state.next_seq,
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        state
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn messages(
        &self,
        conversation_id: Uuid,
        cursor: MessageCursor,
    ) -> Result<Vec<Message>, StoreError> {
        let state = self.state.read().await;

        if !state.conversations.contains_key(&conversation_id) {
            return Err(StoreError::NotFound(format!(
                "conversation {}",
                conversation_id
            )));
        }

        let after = cursor.after.unwrap_or(0);
        let messages: Vec<Message> = state
            .messages
            .get(&conversation_id)
            .map(|list| {
                list.iter()
                    .filter(|m| m.seq > after)
                    .take(cursor.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(messages)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<DeletionReport, StoreError> {
        let mut state = self.state.write().await;

        let profile = state
            .users
            .remove(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        state.handles.remove(&profile.handle);

        let likes_before = state.likes.len();
        state
            .likes
            .retain(|(liker, likee), _| *liker != user_id && *likee != user_id);
        let likes_removed = (likes_before - state.likes.len()) as u64;

        let doomed: HashSet<Uuid> = state
            .conversations
            .values()
            .filter(|c| c.includes(user_id))
            .map(|c| c.id)
            .collect();

        for id in &doomed {
            if let Some(conversation) = state.conversations.remove(id) {
                state.pairs.remove(&conversation.participants);
            }
            state.messages.remove(id);
        }

        Ok(DeletionReport {
            likes_removed,
            conversations_removed: doomed.len() as u64,
        })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
