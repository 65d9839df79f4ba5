//! Entity 定義
//!
//! Room は接続中のメンバーと、メンバーごとの presence（任意のメタデータ）を保持します。
//! presence の中身はサーバーでは解釈しません。

use serde_json::Value;

use super::{
    error::RoomError,
    value_object::{RoomId, Timestamp, UserId},
};

/// Room のデフォルトの人数制限
pub const DEFAULT_MEMBER_CAPACITY: usize = 64;

/// Room に接続中のメンバー
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: UserId,
    pub connected_at: Timestamp,
    /// `track` で登録された presence。未登録なら `None`
    pub presence: Option<Value>,
}

impl Member {
    pub fn new(id: UserId, connected_at: Timestamp) -> Self {
        Self {
            id,
            connected_at,
            presence: None,
        }
    }
}

/// presence スナップショットの 1 エントリ
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub presence: Value,
}

/// Room エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub created_at: Timestamp,
    pub members: Vec<Member>,
    member_capacity: usize,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self::with_capacity(id, created_at, DEFAULT_MEMBER_CAPACITY)
    }

    pub fn with_capacity(id: RoomId, created_at: Timestamp, member_capacity: usize) -> Self {
        Self {
            id,
            created_at,
            members: Vec::new(),
            member_capacity,
        }
    }

    pub fn member_capacity(&self) -> usize {
        self.member_capacity
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.id == user_id)
    }

    /// メンバーを追加する。重複と人数制限を検証する
    pub fn add_member(&mut self, member: Member) -> Result<(), RoomError> {
        if self.contains(&member.id) {
            return Err(RoomError::DuplicateMember(member.id.into_string()));
        }
        if self.members.len() >= self.member_capacity {
            return Err(RoomError::CapacityExceeded {
                capacity: self.member_capacity,
            });
        }
        self.members.push(member);
        Ok(())
    }

    /// メンバーを削除し、削除したメンバーを返す
    pub fn remove_member(&mut self, user_id: &UserId) -> Option<Member> {
        let index = self.members.iter().position(|m| &m.id == user_id)?;
        Some(self.members.remove(index))
    }

    /// presence を登録（または上書き）する
    pub fn set_presence(&mut self, user_id: &UserId, presence: Value) -> Result<(), RoomError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| &m.id == user_id)
            .ok_or_else(|| RoomError::MemberNotFound(user_id.as_str().to_string()))?;
        member.presence = Some(presence);
        Ok(())
    }

    /// presence を削除し、削除前の presence を返す
    pub fn clear_presence(&mut self, user_id: &UserId) -> Result<Option<Value>, RoomError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| &m.id == user_id)
            .ok_or_else(|| RoomError::MemberNotFound(user_id.as_str().to_string()))?;
        Ok(member.presence.take())
    }

    /// presence を登録済みのメンバーのスナップショット（user_id 順）
    pub fn presences(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self
            .members
            .iter()
            .filter_map(|m| {
                m.presence.as_ref().map(|p| PresenceEntry {
                    user_id: m.id.clone(),
                    presence: p.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        entries
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}
