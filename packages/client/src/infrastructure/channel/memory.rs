//! In-process broadcast hub.
//!
//! Same semantics as the room server: one presence record per member,
//! `presence_join` / `presence_leave` followed by a full snapshot, and
//! broadcasts delivered to the whole room including the sender. Each room
//! sits behind its own mutex.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc};

use crate::domain::{
    BroadcastChannel, ChannelError, ChannelEvent, ChannelSubscription, ConnectionStatus, RoomId,
    UserId,
};

#[derive(Default)]
struct HubRoom {
    members: BTreeMap<UserId, HubMember>,
    /// ハブから取り除かれた Room（参加は新しい Room でやり直す）
    closed: bool,
}

struct HubMember {
    sender: mpsc::UnboundedSender<ChannelEvent>,
    presence: Option<Value>,
}

impl HubRoom {
    fn snapshot(&self) -> Vec<Value> {
        self.members
            .values()
            .filter_map(|m| m.presence.clone())
            .collect()
    }
}

#[derive(Default)]
struct HubInner {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<HubRoom>>>>,
    /// メッセージを落とす対象（損失のある伝送路の再現）
    dropping: std::sync::RwLock<HashSet<UserId>>,
}

/// In-process hub shared by any number of `InMemoryChannel`s
///
/// ## 使用例
///
/// ```ignore
/// let hub = InMemoryHub::new();
/// let alice = CollaborationService::new(Arc::new(hub.channel()), clock.clone(), config.clone());
/// let bob = CollaborationService::new(Arc::new(hub.channel()), clock, config);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryHub {
    inner: Arc<HubInner>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// このハブに接続する新しいチャンネルを作成
    pub fn channel(&self) -> InMemoryChannel {
        InMemoryChannel {
            hub: self.clone(),
            membership: Mutex::new(None),
        }
    }

    /// `user_id` 宛ての presence と broadcast を落とすかどうかを切り替える
    pub fn set_dropping(&self, user_id: &UserId, dropping: bool) {
        let mut set = self
            .inner
            .dropping
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if dropping {
            set.insert(user_id.clone());
        } else {
            set.remove(user_id);
        }
    }

    /// Room の現在のメンバー数（Room がなければ 0）
    pub async fn member_count(&self, room_id: &RoomId) -> usize {
        let Some(room) = self.inner.rooms.read().await.get(room_id).cloned() else {
            return 0;
        };
        room.lock().await.members.len()
    }

    fn is_dropping(&self, user_id: &UserId) -> bool {
        self.inner
            .dropping
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(user_id)
    }

    fn fan_out(&self, room: &HubRoom, events: &[ChannelEvent]) {
        for (user_id, member) in &room.members {
            if self.is_dropping(user_id) {
                tracing::debug!("Dropping {} event(s) for '{}'", events.len(), user_id);
                continue;
            }
            for event in events {
                // 受信側が閉じていても他のメンバーへの配送は続ける
                if member.sender.send(event.clone()).is_err() {
                    tracing::debug!("Receiver of '{}' is closed", user_id);
                }
            }
        }
    }

    async fn room(&self, room_id: &RoomId) -> Option<Arc<Mutex<HubRoom>>> {
        self.inner.rooms.read().await.get(room_id).cloned()
    }

    async fn join(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<ChannelSubscription, ChannelError> {
        loop {
            let room = {
                let mut rooms = self.inner.rooms.write().await;
                rooms.entry(room_id.clone()).or_default().clone()
            };
            let mut guard = room.lock().await;
            if guard.closed {
                continue;
            }
            if guard.members.contains_key(user_id) {
                return Err(ChannelError::DuplicateUser(user_id.to_string()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            let snapshot = guard.snapshot();
            // 新しいメンバーには subscribed、続いて現在のスナップショットを送る
            let _ = tx.send(ChannelEvent::Status(ConnectionStatus::Subscribed));
            let _ = tx.send(ChannelEvent::PresenceSync(snapshot));
            guard.members.insert(
                user_id.clone(),
                HubMember {
                    sender: tx,
                    presence: None,
                },
            );
            return Ok(rx);
        }
    }

    async fn set_presence(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        presence: Option<Value>,
    ) -> Result<(), ChannelError> {
        let room = self.room(room_id).await.ok_or(ChannelError::Closed)?;
        let mut guard = room.lock().await;
        let member = guard.members.get_mut(user_id).ok_or(ChannelError::Closed)?;
        let mut events = match presence {
            Some(presence) => {
                member.presence = Some(presence.clone());
                vec![ChannelEvent::PresenceJoin(presence)]
            }
            None => match member.presence.take() {
                Some(previous) => vec![ChannelEvent::PresenceLeave(previous)],
                None => return Ok(()),
            },
        };
        events.push(ChannelEvent::PresenceSync(guard.snapshot()));
        self.fan_out(&guard, &events);
        Ok(())
    }

    async fn publish(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        event: &str,
        payload: Value,
    ) -> Result<(), ChannelError> {
        let room = self.room(room_id).await.ok_or(ChannelError::Closed)?;
        let guard = room.lock().await;
        if !guard.members.contains_key(user_id) {
            return Err(ChannelError::Closed);
        }
        self.fan_out(
            &guard,
            &[ChannelEvent::Broadcast {
                event: event.to_string(),
                payload,
            }],
        );
        Ok(())
    }

    async fn leave(&self, room_id: &RoomId, user_id: &UserId) {
        let Some(room) = self.room(room_id).await else {
            return;
        };
        let now_empty = {
            let mut guard = room.lock().await;
            if let Some(member) = guard.members.remove(user_id)
                && let Some(presence) = member.presence
            {
                let snapshot = guard.snapshot();
                self.fan_out(
                    &guard,
                    &[
                        ChannelEvent::PresenceLeave(presence),
                        ChannelEvent::PresenceSync(snapshot),
                    ],
                );
            }
            guard.members.is_empty()
        };
        if now_empty {
            let mut rooms = self.inner.rooms.write().await;
            let is_current = rooms
                .get(room_id)
                .is_some_and(|current| Arc::ptr_eq(current, &room));
            if is_current
                && let Ok(mut guard) = room.try_lock()
                && guard.members.is_empty()
            {
                guard.closed = true;
                drop(guard);
                rooms.remove(room_id);
            }
        }
    }
}

/// One member's handle on an `InMemoryHub`
pub struct InMemoryChannel {
    hub: InMemoryHub,
    membership: Mutex<Option<(RoomId, UserId)>>,
}

impl InMemoryChannel {
    async fn membership(&self) -> Result<(RoomId, UserId), ChannelError> {
        self.membership.lock().await.clone().ok_or(ChannelError::Closed)
    }
}

#[async_trait]
impl BroadcastChannel for InMemoryChannel {
    async fn subscribe(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<ChannelSubscription, ChannelError> {
        let mut membership = self.membership.lock().await;
        if let Some((old_room, old_user)) = membership.take() {
            self.hub.leave(&old_room, &old_user).await;
        }
        let rx = self.hub.join(room_id, user_id).await?;
        *membership = Some((room_id.clone(), user_id.clone()));
        tracing::debug!("'{}' subscribed to in-memory room '{}'", user_id, room_id);
        Ok(rx)
    }

    async fn track(&self, presence: Value) -> Result<(), ChannelError> {
        let (room_id, user_id) = self.membership().await?;
        self.hub.set_presence(&room_id, &user_id, Some(presence)).await
    }

    async fn untrack(&self) -> Result<(), ChannelError> {
        let (room_id, user_id) = self.membership().await?;
        self.hub.set_presence(&room_id, &user_id, None).await
    }

    async fn publish(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        let (room_id, user_id) = self.membership().await?;
        self.hub.publish(&room_id, &user_id, event, payload).await
    }

    async fn unsubscribe(&self) -> Result<(), ChannelError> {
        if let Some((room_id, user_id)) = self.membership.lock().await.take() {
            self.hub.leave(&room_id, &user_id).await;
            tracing::debug!("'{}' unsubscribed from in-memory room '{}'", user_id, room_id);
        }
        Ok(())
    }
}
