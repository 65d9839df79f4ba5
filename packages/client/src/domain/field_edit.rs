//! Field edits.

use serde_json::Value;

use super::{
    user::CollaborationUser,
    value_object::{ChangeId, FieldPath, UserId},
};

/// "user X changed field Y to value Z at time T"
///
/// Never persisted. Used as a pending change for conflict detection and as
/// the active-edit marker of a field (a lock marker is a `FieldEdit` with a
/// `null` value and a `lock-` change id).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEdit {
    pub user_id: UserId,
    pub user_name: String,
    pub field_path: FieldPath,
    pub value: Value,
    /// Unix milliseconds on the originating client
    pub timestamp: i64,
    pub change_id: ChangeId,
}

impl FieldEdit {
    /// ローカルユーザーの編集を作成する
    pub fn local(user: &CollaborationUser, field_path: FieldPath, value: Value, now: i64) -> Self {
        Self {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            field_path,
            value,
            timestamp: now,
            change_id: ChangeId::generate(&user.id, now),
        }
    }

    /// リモートのロックを表すマーカーを作成する
    pub fn lock_marker(
        user_id: UserId,
        user_name: String,
        field_path: FieldPath,
        timestamp: i64,
    ) -> Self {
        let change_id = ChangeId::for_lock(&user_id, timestamp);
        Self {
            user_id,
            user_name,
            field_path,
            value: Value::Null,
            timestamp,
            change_id,
        }
    }

    pub fn is_lock_marker(&self) -> bool {
        self.change_id.is_lock()
    }
}
