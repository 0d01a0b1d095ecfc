// Core engine exports
pub mod engine;
pub mod validation;

pub use engine::{ChatLimits, MatchEngine, UNKNOWN_SENDER};
pub use validation::{validate_handle, validate_message, MAX_HANDLE_LEN};
