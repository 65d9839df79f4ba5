//! Message formatting utilities for client display.

use tandem_shared::time::timestamp_to_jst_rfc3339;

use crate::domain::{CollaborationUser, ConnectionStatus, FieldEdit, RoomId};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner shown after joining a room
    ///
    /// # Arguments
    ///
    /// * `me` - The local user
    /// * `room_id` - The joined room
    pub fn format_session_joined(me: &CollaborationUser, room_id: &RoomId) -> String {
        format!(
            "\n{}\nJoined '{}' as {} ({}), color {}\nType 'help' for commands. Press Ctrl+C to exit.\n{}\n",
            RULE, room_id, me.name, me.id, me.color, RULE
        )
    }

    pub fn format_user_joined(user: &CollaborationUser) -> String {
        format!(
            "\n+ {} ({}) joined, seen at {}\n",
            user.name,
            user.id,
            timestamp_to_jst_rfc3339(user.last_seen)
        )
    }

    pub fn format_user_left(user_id: &str) -> String {
        format!("\n- {} left\n", user_id)
    }

    /// Format a remote field edit
    ///
    /// # Arguments
    ///
    /// * `edit` - The received edit
    ///
    /// # Returns
    ///
    /// A formatted string with the field, the new value and the editor
    pub fn format_field_edit(edit: &FieldEdit) -> String {
        format!(
            "\n@{}: {} = {}\nedited at {}\n",
            edit.user_name,
            edit.field_path,
            edit.value,
            timestamp_to_jst_rfc3339(edit.timestamp)
        )
    }

    /// Format a confirmation after broadcasting a local edit
    pub fn format_edit_sent(edit: &FieldEdit) -> String {
        format!(
            "{} = {} sent at {}\n",
            edit.field_path,
            edit.value,
            timestamp_to_jst_rfc3339(edit.timestamp)
        )
    }

    /// Format a conflict warning listing every involved edit
    pub fn format_conflict(conflicts: &[FieldEdit]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", THIN_RULE));
        output.push_str("! Conflicting edits detected:\n");
        for edit in conflicts {
            output.push_str(&format!(
                "  {} by {} = {} at {}\n",
                edit.field_path,
                edit.user_name,
                edit.value,
                timestamp_to_jst_rfc3339(edit.timestamp)
            ));
        }
        output.push_str(&format!("{}\n", THIN_RULE));
        output
    }

    pub fn format_lock_changed(field_path: &str, user_name: &str, locked: bool) -> String {
        if locked {
            format!("\n# {} locked by {}\n", field_path, user_name)
        } else {
            format!("\n# {} unlocked\n", field_path)
        }
    }

    pub fn format_connection_status(status: &ConnectionStatus) -> String {
        match status {
            ConnectionStatus::Subscribed => "\n* Connected\n".to_string(),
            ConnectionStatus::Closed => "\n* Connection closed\n".to_string(),
            ConnectionStatus::Error(message) => format!("\n* Connection error: {}\n", message),
        }
    }

    /// Format the list of active users
    ///
    /// # Arguments
    ///
    /// * `users` - Active users other than the local user
    /// * `me` - The local user (marked as "me")
    pub fn format_users(users: &[CollaborationUser], me: Option<&CollaborationUser>) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nUsers:\n", RULE));
        if let Some(me) = me {
            output.push_str(&format!("{} ({}) (me)\n", me.name, me.id));
        }
        if users.is_empty() {
            output.push_str("(No other users)\n");
        }
        for user in users {
            let cursor = match &user.cursor {
                Some(cursor) => match &cursor.field_path {
                    Some(path) => format!(" at ({}, {}) on {}", cursor.x, cursor.y, path),
                    None => format!(" at ({}, {})", cursor.x, cursor.y),
                },
                None => String::new(),
            };
            output.push_str(&format!(
                "{} ({}){} - seen at {}\n",
                user.name,
                user.id,
                cursor,
                timestamp_to_jst_rfc3339(user.last_seen)
            ));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format the fields currently being edited or locked by others
    pub fn format_fields(markers: &[FieldEdit]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nFields:\n", RULE));
        if markers.is_empty() {
            output.push_str("(No active edits)\n");
        }
        for marker in markers {
            if marker.is_lock_marker() {
                output.push_str(&format!(
                    "{} - locked by {}\n",
                    marker.field_path, marker.user_name
                ));
            } else {
                output.push_str(&format!(
                    "{} - being edited by {} ({})\n",
                    marker.field_path, marker.user_name, marker.value
                ));
            }
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_help() -> String {
        "\nCommands:\n\
         \x20 edit <field> <value>     broadcast a field edit (value is JSON, or text)\n\
         \x20 cursor <x> <y> [field]   broadcast a cursor move\n\
         \x20 lock <field>             lock a field\n\
         \x20 unlock <field>           unlock a field\n\
         \x20 who                      list active users\n\
         \x20 fields                   list fields edited or locked by others\n\
         \x20 help                     show this help\n\
         \x20 quit                     leave the session and exit\n"
            .to_string()
    }
}
