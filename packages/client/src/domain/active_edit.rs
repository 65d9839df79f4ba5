//! Active-edit markers and soft field locks.
//!
//! Remote edits and remote locks share one map keyed by field path, so
//! "someone is typing here" and "someone locked this" look the same to
//! queries. Edit markers expire by change id, lock markers only on unlock.

use super::{
    field_edit::FieldEdit,
    state::CollaborationState,
    value_object::{ChangeId, FieldPath, UserId},
};

impl CollaborationState {
    /// フィールドのマーカーを設定する（既存のマーカーは上書き）
    pub fn set_marker(&mut self, edit: FieldEdit) {
        self.active_edits.insert(edit.field_path.clone(), edit);
    }

    /// マーカーが同じ Change ID を持つ場合だけ削除する
    pub fn expire_marker(&mut self, field_path: &FieldPath, change_id: &ChangeId) -> bool {
        match self.active_edits.get(field_path) {
            Some(current) if &current.change_id == change_id => {
                self.active_edits.remove(field_path);
                true
            }
            _ => false,
        }
    }

    /// ロック解除: マーカーの持ち主が解除したユーザーである場合だけ削除する
    pub fn release_lock(&mut self, field_path: &FieldPath, user_id: &UserId) -> bool {
        match self.active_edits.get(field_path) {
            Some(current) if &current.user_id == user_id => {
                self.active_edits.remove(field_path);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear_markers_of(&mut self, user_id: &UserId) -> bool {
        let before = self.active_edits.len();
        self.active_edits.retain(|_, edit| &edit.user_id != user_id);
        before != self.active_edits.len()
    }

    pub fn is_field_locked(&self, field_path: &FieldPath) -> bool {
        self.active_edits.contains_key(field_path)
    }

    pub fn field_editor(&self, field_path: &FieldPath) -> Option<&FieldEdit> {
        self.active_edits.get(field_path)
    }
}
