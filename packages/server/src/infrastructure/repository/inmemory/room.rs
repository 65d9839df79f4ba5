//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! Room ごとに独立した `Mutex` を持ち、Room 同士が互いをブロックしないようにします。
//!
//! ## ロック順序
//!
//! レジストリ（`RwLock<HashMap<..>>`）を保持したまま Room の `Mutex` を待つことはありません。
//! 空になった Room の削除時のみ、レジストリの書き込みロック中に `try_lock` を使います。
//! 削除された Room には `closed` フラグが立ち、それを掴んだ操作はやり直します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    Member, PresenceEntry, RepositoryError, Room, RoomId, RoomRepository, Timestamp, UserId,
    entity::DEFAULT_MEMBER_CAPACITY,
};
use tandem_shared::time::{Clock, SystemClock};

struct RoomSlot {
    room: Room,
    /// レジストリから削除済み
    closed: bool,
}

type SharedSlot = Arc<Mutex<RoomSlot>>;

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    rooms: RwLock<HashMap<RoomId, SharedSlot>>,
    member_capacity: usize,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new(member_capacity: usize) -> Self {
        Self::with_clock(member_capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(member_capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            member_capacity,
            clock,
        }
    }

    async fn get_or_create_slot(&self, room_id: &RoomId) -> SharedSlot {
        if let Some(slot) = self.rooms.read().await.get(room_id) {
            return slot.clone();
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::debug!("Room '{}' created", room_id.as_str());
                Arc::new(Mutex::new(RoomSlot {
                    room: Room::with_capacity(
                        room_id.clone(),
                        Timestamp::new(self.clock.now_millis()),
                        self.member_capacity,
                    ),
                    closed: false,
                }))
            })
            .clone()
    }

    async fn get_slot(&self, room_id: &RoomId) -> Result<SharedSlot, RepositoryError> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))
    }

    /// 空になった Room をレジストリから削除する
    async fn drop_if_empty(&self, room_id: &RoomId, slot: &SharedSlot) {
        let mut rooms = self.rooms.write().await;
        let Some(current) = rooms.get(room_id) else {
            return;
        };
        if !Arc::ptr_eq(current, slot) {
            return;
        }
        // 別の操作が Room を掴んでいる場合は削除しない（その操作が Room を使い続ける）
        if let Ok(mut guard) = slot.try_lock()
            && guard.room.is_empty()
        {
            guard.closed = true;
            rooms.remove(room_id);
            tracing::debug!("Room '{}' removed (no members left)", room_id.as_str());
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new(DEFAULT_MEMBER_CAPACITY)
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn add_member(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        connected_at: Timestamp,
    ) -> Result<(), RepositoryError> {
        loop {
            let slot = self.get_or_create_slot(room_id).await;
            let mut guard = slot.lock().await;
            if guard.closed {
                continue;
            }
            guard
                .room
                .add_member(Member::new(user_id.clone(), connected_at))?;
            return Ok(());
        }
    }

    async fn remove_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Member, RepositoryError> {
        let slot = self.get_slot(room_id).await?;
        let (member, now_empty) = {
            let mut guard = slot.lock().await;
            let member = guard.room.remove_member(user_id).ok_or_else(|| {
                crate::domain::RoomError::MemberNotFound(user_id.as_str().to_string())
            })?;
            (member, guard.room.is_empty())
        };
        if now_empty {
            self.drop_if_empty(room_id, &slot).await;
        }
        Ok(member)
    }

    async fn set_presence(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        presence: Value,
    ) -> Result<(), RepositoryError> {
        let slot = self.get_slot(room_id).await?;
        let mut guard = slot.lock().await;
        guard.room.set_presence(user_id, presence)?;
        Ok(())
    }

    async fn clear_presence(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Value>, RepositoryError> {
        let slot = self.get_slot(room_id).await?;
        let mut guard = slot.lock().await;
        Ok(guard.room.clear_presence(user_id)?)
    }

    async fn get_presences(&self, room_id: &RoomId) -> Result<Vec<PresenceEntry>, RepositoryError> {
        let slot = self.get_slot(room_id).await?;
        let guard = slot.lock().await;
        Ok(guard.room.presences())
    }

    async fn get_member_ids(&self, room_id: &RoomId) -> Vec<UserId> {
        match self.get_slot(room_id).await {
            Ok(slot) => slot.lock().await.room.member_ids(),
            Err(_) => Vec::new(),
        }
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let slot = self.get_slot(room_id).await?;
        let guard = slot.lock().await;
        Ok(guard.room.clone())
    }

    async fn get_rooms(&self) -> Vec<Room> {
        let slots: Vec<SharedSlot> = self.rooms.read().await.values().cloned().collect();
        let mut rooms = Vec::with_capacity(slots.len());
        for slot in slots {
            let guard = slot.lock().await;
            if !guard.closed {
                rooms.push(guard.room.clone());
            }
        }
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }
}
