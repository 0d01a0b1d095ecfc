// Service exports
pub mod auth;
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use auth::{AdminUser, AuthError, Claims, CurrentUser, TokenVerifier};
pub use cache::{CacheError, CacheKey, CacheStats, ProfileCache};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{MatchStore, StoreError};
