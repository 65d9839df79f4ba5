//! UseCase: Room 参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - Room への参加処理（重複チェック、人数制限、MessagePusher への登録）
//!
//! ### なぜこのテストが必要か
//! - 同じ Room に同じユーザーが二重に接続すると presence が壊れる
//! - 新規参加者に渡す presence スナップショットが正しいことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加者の接続
//! - 異常系：重複した user_id での接続試行、人数制限超過
//! - エッジケース：同じ user_id でも別 Room なら接続できる

use std::sync::Arc;

use crate::domain::{
    MessagePusher, PresenceEntry, PusherChannel, RepositoryError, RoomError, RoomId,
    RoomRepository, Timestamp, UserId,
};

use super::error::JoinError;

/// Room 参加のユースケース
pub struct JoinRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// Room 参加を実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 参加する Room の ID
    /// * `user_id` - 参加するユーザーの ID
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Timestamp)` - 参加成功（接続時刻を返す）
    /// * `Err(JoinError)` - 参加失敗
    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        sender: PusherChannel,
    ) -> Result<Timestamp, JoinError> {
        use tandem_shared::time::now_millis;

        // 1. Repository にメンバーを追加（重複・人数制限は Room が検証する）
        let connected_at = Timestamp::new(now_millis());
        self.repository
            .add_member(room_id, user_id.clone(), connected_at)
            .await
            .map_err(|e| match e {
                RepositoryError::Room(RoomError::DuplicateMember(id)) => {
                    JoinError::DuplicateUser(id)
                }
                _ => JoinError::RoomCapacityExceeded,
            })?;

        // 2. MessagePusher にクライアントを登録
        self.message_pusher
            .register_client(room_id, &user_id, sender)
            .await;

        Ok(connected_at)
    }

    /// 現在の presence スナップショットを取得
    ///
    /// 参加直後のクライアントに送る presence_sync の内容になる
    pub async fn presence_snapshot(&self, room_id: &RoomId) -> Vec<PresenceEntry> {
        self.repository
            .get_presences(room_id)
            .await
            .unwrap_or_default()
    }
}
