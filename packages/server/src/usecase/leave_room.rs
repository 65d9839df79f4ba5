//! UseCase: Room 退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 退出処理（メンバー削除、通知対象選定、presence の後始末）
//!
//! ### どのような状況を想定しているか
//! - 正常系：presence 登録済みのメンバーの退出
//! - エッジケース：最後のメンバーの退出（通知対象なし、Room 削除）
//! - 異常系：存在しないメンバーの退出試行

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{MessagePusher, PresenceEntry, RoomId, RoomRepository, UserId};

use super::error::LeaveError;

/// 退出処理の結果
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveOutcome {
    /// 退出したメンバー以外の、まだ接続中のメンバー
    pub notify_targets: Vec<UserId>,
    /// 退出したメンバーの presence（未登録なら None）
    pub presence: Option<Value>,
    /// 退出後の presence スナップショット
    pub snapshot: Vec<PresenceEntry>,
}

/// Room 退出のユースケース
pub struct LeaveRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// Room 退出を実行
    ///
    /// # Returns
    ///
    /// * `Ok(LeaveOutcome)` - 退出成功（通知対象と presence の情報）
    /// * `Err(LeaveError)` - 退出失敗（メンバーが存在しない場合）
    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<LeaveOutcome, LeaveError> {
        // 1. MessagePusher から先に登録解除し、退出処理中のメッセージが届かないようにする
        self.message_pusher
            .unregister_client(room_id, user_id)
            .await;

        // 2. Repository からメンバーを削除
        let member = self
            .repository
            .remove_member(room_id, user_id)
            .await
            .map_err(|_| LeaveError::NotAMember(user_id.as_str().to_string()))?;

        // 3. 通知対象と残りの presence を取得
        let notify_targets = self.repository.get_member_ids(room_id).await;
        let snapshot = self
            .repository
            .get_presences(room_id)
            .await
            .unwrap_or_default();

        Ok(LeaveOutcome {
            notify_targets,
            presence: member.presence,
            snapshot,
        })
    }

    /// 残りのメンバーにメッセージをブロードキャスト
    pub async fn broadcast_to_remaining(
        &self,
        room_id: &RoomId,
        targets: Vec<UserId>,
        message: &str,
    ) -> Result<(), String> {
        self.message_pusher
            .broadcast(room_id, targets, message)
            .await
            .map_err(|e| e.to_string())
    }
}
