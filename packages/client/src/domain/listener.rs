//! Callbacks through which the engine reports to the UI.

use super::{
    channel::ConnectionStatus,
    field_edit::FieldEdit,
    state::CollaborationState,
    user::CollaborationUser,
    value_object::UserId,
};

/// Collaboration event listener
///
/// All methods default to no-ops. They are called from the session's event
/// loop after the state lock is released, and must not block.
#[cfg_attr(test, mockall::automock)]
pub trait CollaborationListener: Send + Sync {
    fn on_user_joined(&self, _user: &CollaborationUser) {}

    fn on_user_left(&self, _user_id: &UserId) {}

    fn on_user_updated(&self, _user: &CollaborationUser) {}

    /// A remote user edited a field
    fn on_field_edit(&self, _edit: &FieldEdit) {}

    /// Edits of the same field by different users within the conflict window
    fn on_conflict_detected(&self, _conflicts: &[FieldEdit]) {}

    fn on_state_changed(&self, _state: &CollaborationState) {}

    fn on_connection_status(&self, _status: &ConnectionStatus) {}
}
