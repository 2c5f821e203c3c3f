use thiserror::Error;
use tupatane_store::StoreError;

/// Errors returned by the service layer.
///
/// Every failure is per-call and recoverable by the caller; the core never
/// retries internally and has no fatal error class.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Candidate search radius was zero, negative, or not finite.
    #[error("Search radius must be positive and finite")]
    InvalidRadius,

    /// A user tried to record a swipe decision about themselves.
    #[error("Cannot record a decision about yourself")]
    SelfDecision,

    /// A user tried to open a conversation with themselves.
    #[error("Cannot open a conversation with yourself")]
    SelfConversation,

    /// A user tried to block themselves.
    #[error("Cannot block yourself")]
    SelfBlock,

    /// Profile age below the product minimum.
    #[error("Profile owner must be at least 18 years old")]
    UnderMinimumAge,

    /// Message body was empty or whitespace-only.
    #[error("Message body is empty")]
    EmptyMessage,

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    /// The acting user is not one of the conversation's two participants.
    #[error("User is not a participant of this conversation")]
    NotAParticipant,

    /// A block exists between the two users, in either direction.
    #[error("A block exists between these users")]
    UserBlocked,

    /// The shared database lock was poisoned by a panicking holder.
    #[error("State lock poisoned")]
    LockPoisoned,

    /// Storage failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
