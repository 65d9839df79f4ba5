//! Collaboration state of one session.

use std::collections::HashMap;

use super::{
    field_edit::FieldEdit,
    user::CollaborationUser,
    value_object::{FieldPath, UserId},
};

/// Projection of the events received in one session
///
/// Created empty on join and discarded on leave.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollaborationState {
    /// Presence directory: everyone else in the room
    pub users: HashMap<UserId, CollaborationUser>,
    /// Active-edit markers and lock markers per field
    pub active_edits: HashMap<FieldPath, FieldEdit>,
    /// Rolling buffer for conflict detection
    pub pending_changes: Vec<FieldEdit>,
}

impl CollaborationState {
    pub fn new() -> Self {
        Self::default()
    }
}
