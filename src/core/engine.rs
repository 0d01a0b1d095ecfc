use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::validation::{validate_handle, validate_message};
use crate::models::{
    Candidate, ConversationSummary, DeletionReport, LikeOutcome, Message, MessageCursor,
    MessagePage, MessageView, NewProfile, Profile, ProfileSummary, UserActivity, UserRef,
};
use crate::services::{CacheStats, MatchStore, ProfileCache, StoreError};

/// Handle shown for a sender that no longer resolves in the directory
pub const UNKNOWN_SENDER: &str = "[deleted]";

/// Limits applied to the chat surface
#[derive(Debug, Clone, Copy)]
pub struct ChatLimits {
    pub max_message_len: usize,
    /// Upper bound on messages returned by one read
    pub page_limit: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            page_limit: 100,
        }
    }
}

/// Match and conversation engine
///
/// Orchestrates candidate selection, the like ledger, reciprocal-match
/// detection and the conversation store on top of a [`MatchStore`].
/// Store-level invariants (pair uniqueness, participancy, atomicity) are
/// enforced by the store; the engine adds input validation and resolves
/// identifiers to display profiles through the [`ProfileCache`].
#[derive(Clone)]
pub struct MatchEngine {
    store: Arc<dyn MatchStore>,
    cache: Arc<ProfileCache>,
    limits: ChatLimits,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn MatchStore>, cache: Arc<ProfileCache>, limits: ChatLimits) -> Self {
        Self {
            store,
            cache,
            limits,
        }
    }

    pub fn limits(&self) -> ChatLimits {
        self.limits
    }

    /// One profile the requester has neither liked nor is, or `Exhausted`
    pub async fn next_candidate(&self, requester: Uuid) -> Result<Candidate, StoreError> {
        match self.store.random_unliked_candidate(requester).await? {
            Some(profile) => {
                tracing::debug!("Offering candidate {} to {}", profile.user_id, requester);
                Ok(Candidate::Available(profile))
            }
            None => {
                tracing::debug!("Candidates exhausted for {}", requester);
                Ok(Candidate::Exhausted)
            }
        }
    }

    /// Record `liker -> likee` and create the conversation on a mutual like
    pub async fn record_like(&self, liker: Uuid, likee: Uuid) -> Result<LikeOutcome, StoreError> {
        if liker == likee {
            return Err(StoreError::SelfReference);
        }

        let outcome = self.store.record_like(liker, likee).await?;

        match outcome {
            LikeOutcome::Matched { conversation_id } => {
                tracing::info!(
                    "Match between {} and {} (conversation {})",
                    liker,
                    likee,
                    conversation_id
                );
            }
            LikeOutcome::Pending => {
                tracing::debug!("Like recorded: {} -> {}", liker, likee);
            }
        }

        Ok(outcome)
    }

    /// Conversations of a user, each with the other participant resolved
    pub async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        self.resolve_user(&UserRef::Id(user_id)).await?;

        let conversations = self.store.conversations_for(user_id).await?;
        let mut summaries = Vec::with_capacity(conversations.len());

        for conversation in conversations {
            let Some(other) = conversation.participants.other(user_id) else {
                continue;
            };

            let other_participant = match self.display_profile(other).await? {
                Some(summary) => summary,
                None => ProfileSummary {
                    user_id: other,
                    handle: UNKNOWN_SENDER.to_string(),
                    avatar_ref: None,
                },
            };

            summaries.push(ConversationSummary {
                conversation_id: conversation.id,
                other_participant,
                created_at: conversation.created_at,
            });
        }

        Ok(summaries)
    }

    /// Append a message after validating content and participancy
    pub async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<MessageView, StoreError> {
        validate_message(content, self.limits.max_message_len)?;

        let message = self
            .store
            .append_message(conversation_id, sender_id, content)
            .await?;

        tracing::debug!(
            "Appended message #{} to conversation {}",
            message.seq,
            conversation_id
        );

        let mut views = self.resolve_messages(vec![message]).await?;
        views
            .pop()
            .ok_or_else(|| StoreError::Unavailable("appended message vanished".to_string()))
    }

    /// Messages in append order, resolved to display form.
    ///
    /// [`MessageCursor::all`] returns the full history; bounded cursors are
    /// capped at the configured page limit.
    pub async fn get_messages(
        &self,
        conversation_id: Uuid,
        cursor: MessageCursor,
    ) -> Result<Vec<MessageView>, StoreError> {
        Ok(self.get_message_page(conversation_id, cursor).await?.messages)
    }

    /// Like [`get_messages`](Self::get_messages), also reporting whether a
    /// bounded window stopped short of the newest message
    pub async fn get_message_page(
        &self,
        conversation_id: Uuid,
        cursor: MessageCursor,
    ) -> Result<MessagePage, StoreError> {
        let limit = cursor
            .limit
            .map(|limit| limit.clamp(1, self.limits.page_limit.max(1)));

        // One extra row tells us whether the window is complete
        let window = MessageCursor {
            after: cursor.after,
            limit: limit.map(|limit| limit + 1),
        };
        let mut messages = self.store.messages(conversation_id, window).await?;

        let has_more = match limit {
            Some(limit) if messages.len() > limit => {
                messages.truncate(limit);
                true
            }
            _ => false,
        };

        Ok(MessagePage {
            messages: self.resolve_messages(messages).await?,
            has_more,
        })
    }

    /// Like [`get_message_page`](Self::get_message_page), restricted to participants
    pub async fn get_message_page_for(
        &self,
        viewer: Uuid,
        conversation_id: Uuid,
        cursor: MessageCursor,
    ) -> Result<MessagePage, StoreError> {
        let conversation = self
            .store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("conversation {}", conversation_id)))?;

        if !conversation.includes(viewer) {
            return Err(StoreError::Forbidden(format!(
                "user {} is not a participant of conversation {}",
                viewer, conversation_id
            )));
        }

        self.get_message_page(conversation_id, cursor).await
    }

    /// Directory lookup by id or handle
    pub async fn resolve_user(&self, user: &UserRef) -> Result<Profile, StoreError> {
        self.store
            .find_user(user)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user)))
    }

    /// Register a directory profile
    pub async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        validate_handle(&profile.handle)?;

        let created = self.store.create_user(profile).await?;
        tracing::info!("Registered profile {} ({})", created.handle, created.user_id);

        Ok(created)
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.store.list_users().await
    }

    /// Administrative view of a user's likes and conversations
    pub async fn user_activity(&self, user_id: Uuid) -> Result<UserActivity, StoreError> {
        let profile = self.resolve_user(&UserRef::Id(user_id)).await?;
        let likes = self.store.likes_by(user_id).await?;
        let conversations = self.store.conversations_for(user_id).await?;

        Ok(UserActivity {
            profile,
            likes,
            conversations,
        })
    }

    /// Remove a user and cascade to their likes and conversations
    pub async fn delete_user(&self, user_id: Uuid) -> Result<DeletionReport, StoreError> {
        let report = self.store.delete_user(user_id).await?;
        self.cache.forget_profile(user_id).await;

        tracing::info!(
            "Removed user {}: {} likes, {} conversations",
            user_id,
            report.likes_removed,
            report.conversations_removed
        );

        Ok(report)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::error!("Store health check failed: {}", e);
                false
            }
        }
    }

    /// Display profile through the cache; `None` if the user is gone
    async fn display_profile(&self, user_id: Uuid) -> Result<Option<ProfileSummary>, StoreError> {
        if let Some(summary) = self.cache.profile(user_id).await {
            return Ok(Some(summary));
        }

        let Some(profile) = self.store.find_user(&UserRef::Id(user_id)).await? else {
            return Ok(None);
        };

        let summary = profile.summary();
        self.cache.put_profile(&summary).await;

        Ok(Some(summary))
    }

    async fn resolve_messages(&self, messages: Vec<Message>) -> Result<Vec<MessageView>, StoreError> {
        let mut handles: HashMap<Uuid, String> = HashMap::new();

        for message in &messages {
            if handles.contains_key(&message.sender_id) {
                continue;
            }

            let handle = self
                .display_profile(message.sender_id)
                .await?
                .map(|summary| summary.handle)
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

            handles.insert(message.sender_id, handle);
        }

        Ok(messages
            .into_iter()
            .map(|message| MessageView {
                seq: message.seq,
                sender_id: message.sender_id,
                sender: handles
                    .get(&message.sender_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
                content: message.content,
                timestamp: message.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn engine() -> MatchEngine {
        MatchEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ProfileCache::in_memory(100, 60)),
            ChatLimits {
                max_message_len: 16,
                page_limit: 3,
            },
        )
    }

    async fn register(engine: &MatchEngine, handle: &str) -> Uuid {
        engine
            .create_profile(NewProfile {
                handle: handle.to_string(),
                bio: format!("{} bio", handle),
                avatar_ref: None,
            })
            .await
            .unwrap()
            .user_id
    }

    async fn matched_pair(engine: &MatchEngine) -> (Uuid, Uuid, Uuid) {
        let alice = register(engine, "alice").await;
        let bob = register(engine, "bob").await;
        engine.record_like(alice, bob).await.unwrap();
        let conversation_id = engine
            .record_like(bob, alice)
            .await
            .unwrap()
            .conversation_id()
            .unwrap();
        (alice, bob, conversation_id)
    }

    #[tokio::test]
    async fn test_rejects_invalid_handle() {
        let engine = engine();
        let err = engine
            .create_profile(NewProfile {
                handle: "no spaces".to_string(),
                bio: String::new(),
                avatar_ref: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_message_too_long_is_not_stored() {
        let engine = engine();
        let (alice, _, conversation_id) = matched_pair(&engine).await;

        let err = engine
            .append_message(conversation_id, alice, "this is far too long to send")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let messages = engine
            .get_messages(conversation_id, MessageCursor::all())
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_page_limit_caps_reads() {
        let engine = engine();
        let (alice, bob, conversation_id) = matched_pair(&engine).await;

        for (sender, text) in [(alice, "1"), (bob, "2"), (alice, "3"), (bob, "4")] {
            engine.append_message(conversation_id, sender, text).await.unwrap();
        }

        let page = engine
            .get_message_page(conversation_id, MessageCursor::page(None, 50))
            .await
            .unwrap();
        let contents: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "2", "3"]);
        assert!(page.has_more);

        let rest = engine
            .get_message_page(conversation_id, MessageCursor::after(page.messages[2].seq, 50))
            .await
            .unwrap();
        assert_eq!(rest.messages.len(), 1);
        assert_eq!(rest.messages[0].content, "4");
        assert_eq!(rest.messages[0].sender, "bob");
        assert!(!rest.has_more);
    }

    #[tokio::test]
    async fn test_full_read_ignores_page_limit() {
        let engine = engine();
        let (alice, bob, conversation_id) = matched_pair(&engine).await;

        for i in 0..10 {
            let sender = if i % 2 == 0 { alice } else { bob };
            engine
                .append_message(conversation_id, sender, &i.to_string())
                .await
                .unwrap();
        }

        let messages = engine
            .get_messages(conversation_id, MessageCursor::all())
            .await
            .unwrap();
        assert_eq!(messages.len(), 10);
        assert!(messages.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[tokio::test]
    async fn test_exact_page_has_no_more() {
        let engine = engine();
        let (alice, _, conversation_id) = matched_pair(&engine).await;

        for text in ["a", "b", "c"] {
            engine.append_message(conversation_id, alice, text).await.unwrap();
        }

        let page = engine
            .get_message_page(conversation_id, MessageCursor::page(None, 3))
            .await
            .unwrap();
        assert_eq!(page.messages.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_outsider_cannot_read() {
        let engine = engine();
        let (_, _, conversation_id) = matched_pair(&engine).await;
        let mallory = register(&engine, "mallory").await;

        let err = engine
            .get_message_page_for(mallory, conversation_id, MessageCursor::all())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_conversation_summary_names_other_side() {
        let engine = engine();
        let (alice, bob, conversation_id) = matched_pair(&engine).await;

        let for_alice = engine.list_conversations(alice).await.unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].conversation_id, conversation_id);
        assert_eq!(for_alice[0].other_participant.user_id, bob);
        assert_eq!(for_alice[0].other_participant.handle, "bob");
    }

    #[tokio::test]
    async fn test_user_activity() {
        let engine = engine();
        let (alice, bob, _) = matched_pair(&engine).await;

        let activity = engine.user_activity(alice).await.unwrap();
        assert_eq!(activity.profile.handle, "alice");
        assert_eq!(activity.likes.len(), 1);
        assert_eq!(activity.likes[0].likee_id, bob);
        assert_eq!(activity.conversations.len(), 1);
    }
}
