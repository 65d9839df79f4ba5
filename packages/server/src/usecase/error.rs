//! UseCase error types.

use thiserror::Error;

/// Room 参加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("User '{0}' is already connected to this room")]
    DuplicateUser(String),

    #[error("Room capacity exceeded")]
    RoomCapacityExceeded,
}

/// presence 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    #[error("User '{0}' is not a member of the room")]
    NotAMember(String),
}

/// Room 退出のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveError {
    #[error("User '{0}' is not a member of the room")]
    NotAMember(String),
}

/// ブロードキャストのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("User '{0}' is not a member of the room")]
    NotAMember(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),
}

/// Room 詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Invalid room id")]
    InvalidRoomId,
}
