//! Lume Connect - like, match and conversation service for Lume dating app
//!
//! Users are offered candidate profiles, record one-directional likes, and
//! are placed into a shared conversation once both sides have liked each
//! other. The engine in [`core`] runs on any [`services::MatchStore`]; the
//! HTTP surface in [`routes`] exposes it.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{ChatLimits, MatchEngine};
pub use models::{Candidate, Conversation, LikeOutcome, Message, MessageView, Profile, UserRef};
pub use services::{MatchStore, MemoryStore, PostgresStore, ProfileCache, StoreError};
