//! UseCase: ブロードキャスト送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PublishBroadcastUseCase::execute() メソッド
//! - ブロードキャスト対象の選定（送信者を含むかどうか）
//!
//! ### なぜこのテストが必要か
//! - クライアントは自分のブロードキャストが自分にも届く前提で自己エコーを捨てる
//! - echo_to_sender を無効にした場合は送信者以外にだけ届くことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：Room 全員へのブロードキャスト
//! - 異常系：Room のメンバーでないユーザーからの送信

use std::sync::Arc;

use crate::domain::{MessagePusher, RoomId, RoomRepository, UserId};

use super::error::PublishError;

/// ブロードキャスト送信のユースケース
pub struct PublishBroadcastUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    /// 送信者自身にもブロードキャストを届けるか
    echo_to_sender: bool,
}

impl PublishBroadcastUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        echo_to_sender: bool,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            echo_to_sender,
        }
    }

    /// ブロードキャストを実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 送信先の Room
    /// * `from_user_id` - 送信者
    /// * `json_message` - 送信する JSON（DTO 層で生成されたもの）
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UserId>)` - ブロードキャスト対象
    /// * `Err(PublishError)` - 送信失敗
    pub async fn execute(
        &self,
        room_id: &RoomId,
        from_user_id: &UserId,
        json_message: &str,
    ) -> Result<Vec<UserId>, PublishError> {
        let members = self.repository.get_member_ids(room_id).await;
        if !members.contains(from_user_id) {
            return Err(PublishError::NotAMember(from_user_id.as_str().to_string()));
        }

        let targets: Vec<UserId> = if self.echo_to_sender {
            members
        } else {
            members
                .into_iter()
                .filter(|id| id != from_user_id)
                .collect()
        };

        self.message_pusher
            .broadcast(room_id, targets.clone(), json_message)
            .await
            .map_err(|e| PublishError::BroadcastFailed(e.to_string()))?;

        Ok(targets)
    }
}
