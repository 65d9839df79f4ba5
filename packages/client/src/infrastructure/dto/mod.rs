//! Payload DTOs of the collaboration events.
//!
//! - `payload`: camelCase JSON bodies of presence records and broadcasts
//! - `conversion`: DTO ⇔ domain conversions with validation

pub mod conversion;
pub mod payload;

/// Broadcast event names
pub mod event {
    pub const FIELD_EDIT: &str = "field_edit";
    pub const CURSOR_MOVE: &str = "cursor_move";
    pub const FIELD_LOCK: &str = "field_lock";
    pub const FIELD_UNLOCK: &str = "field_unlock";
}
