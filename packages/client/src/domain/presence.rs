//! Presence directory: who else is in the room.
//!
//! The directory lives in `CollaborationState::users`. Snapshots replace it,
//! join/leave events patch it and cursor updates refresh `last_seen`.

use super::{
    state::CollaborationState,
    user::{CollaborationUser, Cursor},
    value_object::UserId,
};

/// upsert の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

impl CollaborationState {
    /// ディレクトリをスナップショットで丸ごと置き換える（マージしない）
    ///
    /// スナップショットにいないユーザーのマーカーとロックも取り除く。
    pub fn replace_users(&mut self, users: impl IntoIterator<Item = CollaborationUser>) {
        self.users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        let users = &self.users;
        self.active_edits.retain(|_, edit| users.contains_key(&edit.user_id));
    }

    pub fn upsert_user(&mut self, user: CollaborationUser) -> Upsert {
        match self.users.insert(user.id.clone(), user) {
            Some(_) => Upsert::Updated,
            None => Upsert::Inserted,
        }
    }

    /// ユーザーを削除し、そのユーザーのマーカーとロックも取り除く
    pub fn remove_user(&mut self, user_id: &UserId) -> Option<CollaborationUser> {
        self.clear_markers_of(user_id);
        self.users.remove(user_id)
    }

    /// 既知のユーザーのカーソルを更新する。未知のユーザーは無視して None を返す
    pub fn update_cursor(
        &mut self,
        user_id: &UserId,
        cursor: Cursor,
        now: i64,
    ) -> Option<CollaborationUser> {
        let user = self.users.get_mut(user_id)?;
        user.cursor = Some(cursor);
        user.last_seen = now;
        Some(user.clone())
    }

    /// staleness の閾値以内に更新があったユーザー（名前順）
    pub fn active_users(&self, now: i64, staleness_ms: i64) -> Vec<CollaborationUser> {
        let mut users: Vec<CollaborationUser> = self
            .users
            .values()
            .filter(|u| u.is_active(now, staleness_ms))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        users
    }
}
