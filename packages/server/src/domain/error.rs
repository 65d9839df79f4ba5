//! Domain error types.

use thiserror::Error;

/// Value Object の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("ID must not be empty")]
    EmptyId,

    #[error("ID is too long: {actual} characters (max {max})")]
    TooLong { max: usize, actual: usize },

    #[error("ID contains an invalid character: {0:?}")]
    InvalidCharacter(char),
}

/// Room エンティティの不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("User '{0}' is already a member of the room")]
    DuplicateMember(String),

    #[error("Room capacity exceeded (capacity: {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("User '{0}' is not a member of the room")]
    MemberNotFound(String),
}

/// Repository のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
