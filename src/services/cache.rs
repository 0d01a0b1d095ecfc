use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ProfileSummary;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Two-tier cache for display profiles
///
/// L1 is an in-process moka cache; L2 is an optional Redis shared across
/// instances. Without Redis the cache runs L1-only. Redis failures on read
/// are treated as misses so a flaky L2 never fails a request.
pub struct ProfileCache {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl ProfileCache {
    /// Create a cache backed by Redis at `redis_url`
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an L1-only cache
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let Some(redis) = &self.redis else {
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        let mut conn = redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            // Populate L1 cache
            let bytes = json.as_bytes().to_vec();
            self.l1_cache.insert(key.to_string(), bytes).await;

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        let bytes = json.as_bytes().to_vec();
        self.l1_cache.insert(key.to_string(), bytes).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Cached display profile, `None` on miss or cache failure
    pub async fn profile(&self, user_id: Uuid) -> Option<ProfileSummary> {
        match self.get(&CacheKey::profile(user_id)).await {
            Ok(summary) => Some(summary),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!("Profile cache read failed for {}: {}", user_id, e);
                None
            }
        }
    }

    pub async fn put_profile(&self, summary: &ProfileSummary) {
        if let Err(e) = self.set(&CacheKey::profile(summary.user_id), summary).await {
            tracing::warn!("Profile cache write failed for {}: {}", summary.user_id, e);
        }
    }

    pub async fn forget_profile(&self, user_id: Uuid) {
        if let Err(e) = self.delete(&CacheKey::profile(user_id)).await {
            tracing::warn!("Profile cache invalidation failed for {}: {}", user_id, e);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.has_redis(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a display profile
    pub fn profile(user_id: Uuid) -> String {
        format!("connect:profile:{}", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(handle: &str) -> ProfileSummary {
        ProfileSummary {
            user_id: Uuid::new_v4(),
            handle: handle.to_string(),
            avatar_ref: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_profile_roundtrip() {
        let cache = ProfileCache::in_memory(100, 60);
        let alice = summary("alice");

        assert!(cache.profile(alice.user_id).await.is_none());

        cache.put_profile(&alice).await;
        assert_eq!(cache.profile(alice.user_id).await, Some(alice.clone()));

        cache.forget_profile(alice.user_id).await;
        assert!(cache.profile(alice.user_id).await.is_none());
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = ProfileCache::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);

        cache.delete(key).await.unwrap();
        assert!(cache.get::<String>(key).await.is_err());
    }

    #[test]
    fn test_cache_key_builder() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::profile(id),
            "connect:profile:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_stats_without_redis() {
        let cache = ProfileCache::in_memory(10, 30);
        let stats = cache.stats();
        assert!(!stats.redis_enabled);
        assert_eq!(stats.ttl_secs, 30);
    }
}
