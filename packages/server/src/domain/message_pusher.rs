//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信（通知）のインターフェース。
//! 具体的な実装（WebSocket など）は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{MessagePushError, RoomId, UserId};

/// クライアントへのメッセージ送信チャンネル（シリアライズ済み JSON）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送信のインターフェース
///
/// 接続は (RoomId, UserId) の組で識別されます。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// クライアントの送信チャンネルを登録
    async fn register_client(&self, room_id: &RoomId, user_id: &UserId, sender: PusherChannel);

    /// クライアントの送信チャンネルを登録解除
    async fn unregister_client(&self, room_id: &RoomId, user_id: &UserId);

    /// 特定のクライアントにメッセージを送信
    async fn push_to(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数のクライアントにメッセージをブロードキャスト（一部の送信失敗は許容）
    async fn broadcast(
        &self,
        room_id: &RoomId,
        targets: Vec<UserId>,
        content: &str,
    ) -> Result<(), MessagePushError>;
}
