//! Domain error types.

use thiserror::Error;

/// Value Object の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),

    #[error("Invalid change id: {0}")]
    InvalidChangeId(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// Broadcast channel errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The user is already connected to the room
    #[error("User '{0}' is already connected to this room")]
    DuplicateUser(String),

    #[error("Channel is closed")]
    Closed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Collaboration session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaborationError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CollaborationError {
    /// Reconnecting cannot fix this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CollaborationError::Channel(ChannelError::DuplicateUser(_))
                | CollaborationError::Domain(_)
        )
    }
}
