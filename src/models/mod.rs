// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Candidate, Conversation, ConversationSummary, DeletionReport, Like, LikeOutcome, Message,
    MessageCursor, MessagePage, MessageView, NewProfile, PairKey, Profile, ProfileSummary,
    UserActivity, UserRef,
};
pub use requests::{CreateProfileRequest, LikeRequest, MessagesQuery, SendMessageRequest};
pub use responses::{
    CandidateResponse, ConversationsResponse, DeleteUserResponse, ErrorResponse, HealthResponse,
    LikeResponse, MessagesResponse,
};
