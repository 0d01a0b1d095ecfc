// Integration tests for Lume Connect

use lume_connect::core::{ChatLimits, MatchEngine};
use lume_connect::models::{Candidate, LikeOutcome, MessageCursor, NewProfile};
use lume_connect::services::{MatchStore, MemoryStore, ProfileCache, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

fn create_engine() -> MatchEngine {
    MatchEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ProfileCache::in_memory(1000, 60)),
        ChatLimits::default(),
    )
}

async fn create_user(engine: &MatchEngine, handle: &str) -> Uuid {
    engine
        .create_profile(NewProfile {
            handle: handle.to_string(),
            bio: format!("Hi, I'm {}", handle),
            avatar_ref: Some(format!("/avatars/{}.png", handle)),
        })
        .await
        .expect("Failed to create profile")
        .user_id
}

async fn conversation_count(engine: &MatchEngine, user: Uuid) -> usize {
    engine.list_conversations(user).await.unwrap().len()
}

#[tokio::test]
async fn test_integration_alice_and_bob_scenario() {
    let engine = create_engine();
    let alice = create_user(&engine, "alice").await;
    let bob = create_user(&engine, "bob").await;

    let first = engine.record_like(alice, bob).await.unwrap();
    assert_eq!(first, LikeOutcome::Pending);

    let second = engine.record_like(bob, alice).await.unwrap();
    let conversation_id = second.conversation_id().expect("Expected a match");

    let messages = engine
        .get_messages(conversation_id, MessageCursor::all())
        .await
        .unwrap();
    assert!(messages.is_empty());

    let stored = engine
        .append_message(conversation_id, alice, "hi")
        .await
        .unwrap();
    assert_eq!(stored.sender, "alice");
    assert_eq!(stored.content, "hi");

    let messages = engine
        .get_messages(conversation_id, MessageCursor::all())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, "alice");
    assert_eq!(messages[0].sender_id, alice);
    assert_eq!(messages[0].content, "hi");
}

#[tokio::test]
async fn test_integration_repeat_likes_rejected_without_second_conversation() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;
    let b = create_user(&engine, "b").await;

    engine.record_like(a, b).await.unwrap();
    engine.record_like(b, a).await.unwrap();

    assert!(matches!(
        engine.record_like(a, b).await,
        Err(StoreError::DuplicateLike)
    ));
    assert!(matches!(
        engine.record_like(b, a).await,
        Err(StoreError::DuplicateLike)
    ));

    assert_eq!(conversation_count(&engine, a).await, 1);
    assert_eq!(conversation_count(&engine, b).await, 1);
}

#[tokio::test]
async fn test_integration_duplicate_like_before_match() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;
    let b = create_user(&engine, "b").await;

    engine.record_like(a, b).await.unwrap();
    assert!(matches!(
        engine.record_like(a, b).await,
        Err(StoreError::DuplicateLike)
    ));
    assert_eq!(conversation_count(&engine, a).await, 0);
}

#[tokio::test]
async fn test_integration_self_like_rejected() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;

    assert!(matches!(
        engine.record_like(a, a).await,
        Err(StoreError::SelfReference)
    ));
}

#[tokio::test]
async fn test_integration_like_unknown_user() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;

    assert!(matches!(
        engine.record_like(a, Uuid::new_v4()).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        engine.record_like(Uuid::new_v4(), a).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_integration_candidates_never_self_or_liked_then_exhausted() {
    let engine = create_engine();
    let me = create_user(&engine, "me").await;

    let mut others = HashSet::new();
    for i in 0..6 {
        others.insert(create_user(&engine, &format!("user{}", i)).await);
    }

    let mut liked = HashSet::new();
    loop {
        match engine.next_candidate(me).await.unwrap() {
            Candidate::Available(profile) => {
                assert_ne!(profile.user_id, me);
                assert!(!liked.contains(&profile.user_id));
                assert!(others.contains(&profile.user_id));

                engine.record_like(me, profile.user_id).await.unwrap();
                liked.insert(profile.user_id);
            }
            Candidate::Exhausted => break,
        }
        assert!(liked.len() <= others.len(), "Candidate selection did not terminate");
    }

    assert_eq!(liked, others);
    assert_eq!(engine.next_candidate(me).await.unwrap(), Candidate::Exhausted);
}

#[tokio::test]
async fn test_integration_lone_user_is_exhausted() {
    let engine = create_engine();
    let me = create_user(&engine, "me").await;

    assert_eq!(engine.next_candidate(me).await.unwrap(), Candidate::Exhausted);
}

#[tokio::test]
async fn test_integration_candidate_for_unknown_user() {
    let engine = create_engine();
    create_user(&engine, "someone").await;

    assert!(matches!(
        engine.next_candidate(Uuid::new_v4()).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_integration_message_order_is_append_order() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;
    let b = create_user(&engine, "b").await;
    engine.record_like(a, b).await.unwrap();
    let conversation_id = engine.record_like(b, a).await.unwrap().conversation_id().unwrap();

    engine.append_message(conversation_id, a, "m1").await.unwrap();
    engine.append_message(conversation_id, b, "m2").await.unwrap();
    engine.append_message(conversation_id, a, "m3").await.unwrap();

    let messages = engine
        .get_messages(conversation_id, MessageCursor::all())
        .await
        .unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m1", "m2", "m3"]);

    let senders: Vec<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
    assert_eq!(senders, vec!["a", "b", "a"]);
}

#[tokio::test]
async fn test_integration_non_participant_forbidden_and_list_unchanged() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;
    let b = create_user(&engine, "b").await;
    let c = create_user(&engine, "c").await;
    engine.record_like(a, b).await.unwrap();
    let conversation_id = engine.record_like(b, a).await.unwrap().conversation_id().unwrap();

    engine.append_message(conversation_id, a, "hello").await.unwrap();

    assert!(matches!(
        engine.append_message(conversation_id, c, "intrusion").await,
        Err(StoreError::Forbidden(_))
    ));

    let messages = engine
        .get_messages(conversation_id, MessageCursor::all())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");
}

#[tokio::test]
async fn test_integration_message_to_unknown_conversation() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;

    assert!(matches!(
        engine.append_message(Uuid::new_v4(), a, "hello").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        engine.get_messages(Uuid::new_v4(), MessageCursor::all()).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_integration_delete_user_cascades() {
    let engine = create_engine();
    let alice = create_user(&engine, "alice").await;
    let bob = create_user(&engine, "bob").await;
    let carol = create_user(&engine, "carol").await;

    engine.record_like(alice, bob).await.unwrap();
    let conversation_id = engine.record_like(bob, alice).await.unwrap().conversation_id().unwrap();
    engine.record_like(bob, carol).await.unwrap();
    engine.append_message(conversation_id, bob, "hey").await.unwrap();

    let report = engine.delete_user(bob).await.unwrap();
    assert_eq!(report.likes_removed, 3);
    assert_eq!(report.conversations_removed, 1);

    assert_eq!(conversation_count(&engine, alice).await, 0);
    assert!(matches!(
        engine.get_messages(conversation_id, MessageCursor::all()).await,
        Err(StoreError::NotFound(_))
    ));

    // Only carol remains as a candidate for alice
    for _ in 0..10 {
        match engine.next_candidate(alice).await.unwrap() {
            Candidate::Available(profile) => assert_eq!(profile.user_id, carol),
            Candidate::Exhausted => panic!("carol should still be available"),
        }
    }

    assert!(engine.user_activity(alice).await.unwrap().likes.is_empty());
    assert!(matches!(
        engine.delete_user(bob).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_integration_rematch_after_delete_creates_fresh_conversation() {
    let engine = create_engine();
    let alice = create_user(&engine, "alice").await;
    let bob = create_user(&engine, "bob").await;

    engine.record_like(alice, bob).await.unwrap();
    let first = engine.record_like(bob, alice).await.unwrap().conversation_id().unwrap();

    engine.delete_user(bob).await.unwrap();
    let bob = create_user(&engine, "bob").await;

    engine.record_like(alice, bob).await.unwrap();
    let second = engine.record_like(bob, alice).await.unwrap().conversation_id().unwrap();

    assert_ne!(first, second);
    let summaries = engine.list_conversations(alice).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].other_participant.handle, "bob");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_concurrent_mutual_likes_create_one_conversation() {
    let store = Arc::new(MemoryStore::new());
    let engine = MatchEngine::new(
        store.clone(),
        Arc::new(ProfileCache::in_memory(1000, 60)),
        ChatLimits::default(),
    );

    for round in 0..50 {
        let a = create_user(&engine, &format!("left{}", round)).await;
        let b = create_user(&engine, &format!("right{}", round)).await;

        let e1 = engine.clone();
        let e2 = engine.clone();
        let h1 = tokio::spawn(async move { e1.record_like(a, b).await });
        let h2 = tokio::spawn(async move { e2.record_like(b, a).await });

        let r1 = h1.await.unwrap().unwrap();
        let r2 = h2.await.unwrap().unwrap();

        assert_eq!(
            r1.is_match() as u8 + r2.is_match() as u8,
            1,
            "exactly one side observes the match"
        );
        assert_eq!(store.conversations_for(a).await.unwrap().len(), 1);
        assert_eq!(store.conversations_for(b).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_integration_full_read_returns_history_beyond_page_limit() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;
    let b = create_user(&engine, "b").await;
    engine.record_like(a, b).await.unwrap();
    let conversation_id = engine.record_like(b, a).await.unwrap().conversation_id().unwrap();

    let page_limit = engine.limits().page_limit;
    let total = page_limit + 50;
    for i in 0..total {
        let sender = if i % 2 == 0 { a } else { b };
        engine
            .append_message(conversation_id, sender, &format!("m{}", i))
            .await
            .unwrap();
    }

    let messages = engine
        .get_messages(conversation_id, MessageCursor::all())
        .await
        .unwrap();
    assert_eq!(messages.len(), total);
    assert_eq!(messages[0].content, "m0");
    assert_eq!(messages[total - 1].content, format!("m{}", total - 1));

    // Paging walks the same history without gaps
    let mut paged = Vec::new();
    let mut after = None;
    loop {
        let page = engine
            .get_message_page(conversation_id, MessageCursor::page(after, page_limit))
            .await
            .unwrap();
        assert!(page.messages.len() <= page_limit);
        after = page.messages.last().map(|m| m.seq).or(after);
        paged.extend(page.messages);
        if !page.has_more {
            break;
        }
    }
    assert_eq!(paged, messages);
}

#[tokio::test]
async fn test_integration_poll_with_cursor() {
    let engine = create_engine();
    let a = create_user(&engine, "a").await;
    let b = create_user(&engine, "b").await;
    engine.record_like(a, b).await.unwrap();
    let conversation_id = engine.record_like(b, a).await.unwrap().conversation_id().unwrap();

    let first = engine.append_message(conversation_id, a, "one").await.unwrap();

    let since_first = engine
        .get_messages(conversation_id, MessageCursor::after(first.seq, 100))
        .await
        .unwrap();
    assert!(since_first.is_empty());

    engine.append_message(conversation_id, b, "two").await.unwrap();

    let since_first = engine
        .get_messages(conversation_id, MessageCursor::after(first.seq, 100))
        .await
        .unwrap();
    assert_eq!(since_first.len(), 1);
    assert_eq!(since_first[0].content, "two");
}
