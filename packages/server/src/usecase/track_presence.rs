//! UseCase: presence の登録・削除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TrackPresenceUseCase::track() / untrack()
//! - presence の変更後に Room 全員（本人を含む）へ通知されること
//!
//! ### なぜこのテストが必要か
//! - presence_sync は各クライアントのディレクトリを丸ごと置き換えるため、
//!   スナップショットが常に最新でなければならない

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{MessagePusher, PresenceEntry, RoomId, RoomRepository, UserId};

use super::error::PresenceError;

/// untrack の結果
#[derive(Debug, Clone, PartialEq)]
pub struct Untracked {
    /// 削除された presence（未登録だった場合は None）
    pub previous: Option<Value>,
    /// 削除後の presence スナップショット
    pub snapshot: Vec<PresenceEntry>,
}

/// presence 登録・削除のユースケース
pub struct TrackPresenceUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl TrackPresenceUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// presence を登録し、登録後のスナップショットを返す
    pub async fn track(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        presence: Value,
    ) -> Result<Vec<PresenceEntry>, PresenceError> {
        self.repository
            .set_presence(room_id, user_id, presence)
            .await
            .map_err(|_| PresenceError::NotAMember(user_id.as_str().to_string()))?;

        self.repository
            .get_presences(room_id)
            .await
            .map_err(|_| PresenceError::NotAMember(user_id.as_str().to_string()))
    }

    /// presence を削除する
    pub async fn untrack(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Untracked, PresenceError> {
        let previous = self
            .repository
            .clear_presence(room_id, user_id)
            .await
            .map_err(|_| PresenceError::NotAMember(user_id.as_str().to_string()))?;
        let snapshot = self.repository.get_presences(room_id).await.unwrap_or_default();
        Ok(Untracked { previous, snapshot })
    }

    /// Room の全メンバー（本人を含む）にメッセージを送る
    pub async fn broadcast_to_room(&self, room_id: &RoomId, message: &str) -> Result<(), String> {
        let targets = self.repository.get_member_ids(room_id).await;
        self.message_pusher
            .broadcast(room_id, targets, message)
            .await
            .map_err(|e| e.to_string())
    }
}
