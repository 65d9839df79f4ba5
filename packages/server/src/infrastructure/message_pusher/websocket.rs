//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - WebSocket の `UnboundedSender` を (RoomId, UserId) ごとに管理
//! - クライアントへのメッセージ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! Room ごとに別の `Mutex` を持つため、ある Room へのブロードキャストが
//! 別の Room の送信を待たせることはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{MessagePushError, MessagePusher, PusherChannel, RoomId, UserId};

type RoomChannels = Arc<Mutex<HashMap<UserId, PusherChannel>>>;

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_client(&room_id, &user_id, tx).await;
/// pusher.push_to(&room_id, &user_id, "{\"type\":\"subscribed\"}").await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Key: RoomId, Value: その Room に接続中のクライアントの sender
    rooms: RwLock<HashMap<RoomId, RoomChannels>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }

    async fn room_channels(&self, room_id: &RoomId) -> Option<RoomChannels> {
        self.rooms.read().await.get(room_id).cloned()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, room_id: &RoomId, user_id: &UserId, sender: PusherChannel) {
        // Room の削除と競合しないよう、レジストリの書き込みロック中に登録する
        let mut rooms = self.rooms.write().await;
        let channels = rooms.entry(room_id.clone()).or_default().clone();
        channels.lock().await.insert(user_id.clone(), sender);
        drop(rooms);
        tracing::debug!(
            "Client '{}' registered to MessagePusher (room '{}')",
            user_id.as_str(),
            room_id.as_str()
        );
    }

    async fn unregister_client(&self, room_id: &RoomId, user_id: &UserId) {
        let Some(channels) = self.room_channels(room_id).await else {
            return;
        };
        let now_empty = {
            let mut channels = channels.lock().await;
            channels.remove(user_id);
            channels.is_empty()
        };
        if now_empty {
            let mut rooms = self.rooms.write().await;
            let is_current = rooms
                .get(room_id)
                .is_some_and(|current| Arc::ptr_eq(current, &channels));
            if is_current
                && let Ok(guard) = channels.try_lock()
                && guard.is_empty()
            {
                drop(guard);
                rooms.remove(room_id);
            }
        }
        tracing::debug!(
            "Client '{}' unregistered from MessagePusher (room '{}')",
            user_id.as_str(),
            room_id.as_str()
        );
    }

    async fn push_to(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let Some(channels) = self.room_channels(room_id).await else {
            return Err(MessagePushError::ClientNotFound(
                user_id.as_str().to_string(),
            ));
        };
        let channels = channels.lock().await;

        if let Some(sender) = channels.get(user_id) {
            sender
                .send(content.to_string())
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed message to client '{}'", user_id.as_str());
            Ok(())
        } else {
            Err(MessagePushError::ClientNotFound(
                user_id.as_str().to_string(),
            ))
        }
    }

    async fn broadcast(
        &self,
        room_id: &RoomId,
        targets: Vec<UserId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let Some(channels) = self.room_channels(room_id).await else {
            tracing::debug!(
                "No clients registered for room '{}', skipping broadcast",
                room_id.as_str()
            );
            return Ok(());
        };
        let channels = channels.lock().await;

        for target in targets {
            if let Some(sender) = channels.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                if let Err(e) = sender.send(content.to_string()) {
                    tracing::warn!(
                        "Failed to push message to client '{}': {}",
                        target.as_str(),
                        e
                    );
                } else {
                    tracing::debug!("Broadcasted message to client '{}'", target.as_str());
                }
            } else {
                tracing::warn!(
                    "Client '{}' not found during broadcast, skipping",
                    target.as_str()
                );
            }
        }

        Ok(())
    }
}
