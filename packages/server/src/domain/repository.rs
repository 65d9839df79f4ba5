//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! Room 同士は独立しており、ある Room への操作が別の Room をブロックしてはいけません。

use async_trait::async_trait;
use serde_json::Value;

use super::{Member, PresenceEntry, RepositoryError, Room, RoomId, Timestamp, UserId};

/// Room Repository trait
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Room にメンバーを追加（Room が存在しなければ作成）
    async fn add_member(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        connected_at: Timestamp,
    ) -> Result<(), RepositoryError>;

    /// Room からメンバーを削除（最後のメンバーなら Room も削除）
    async fn remove_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Member, RepositoryError>;

    /// メンバーの presence を登録
    async fn set_presence(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        presence: Value,
    ) -> Result<(), RepositoryError>;

    /// メンバーの presence を削除し、削除前の presence を返す
    async fn clear_presence(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Value>, RepositoryError>;

    /// Room の presence スナップショットを取得
    async fn get_presences(&self, room_id: &RoomId) -> Result<Vec<PresenceEntry>, RepositoryError>;

    /// Room に接続中の全メンバーの User ID を取得（Room がなければ空）
    async fn get_member_ids(&self, room_id: &RoomId) -> Vec<UserId>;

    /// Room エンティティを取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 全ての Room を取得（Room ID 順）
    async fn get_rooms(&self) -> Vec<Room>;
}
