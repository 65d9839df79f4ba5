//! WebSocket frame DTOs.
//!
//! Every frame is a JSON text message tagged with `type`. Presence blobs and
//! broadcast payloads are opaque JSON to the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent by a client to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Publish or update this connection's presence
    Track { presence: Value },
    /// Remove this connection's presence
    Untrack,
    /// Broadcast a typed event to the room
    Broadcast { event: String, payload: Value },
}

/// Frames sent by the server to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// The connection joined the room and will receive its traffic
    Subscribed { room_id: String, user_id: String },
    /// Authoritative snapshot of everyone currently present
    PresenceSync { presences: Vec<PresenceEntryDto> },
    PresenceJoin { key: String, presence: Value },
    PresenceLeave { key: String, presence: Value },
    Broadcast { event: String, payload: Value },
    Error { message: String },
}

/// One presence entry, keyed by the member's user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntryDto {
    pub key: String,
    pub presence: Value,
}

impl ServerFrame {
    pub fn to_json(&self) -> String {
        // ServerFrame only holds strings and serde_json::Value, serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize server frame: {}", e);
            String::from(r#"{"type":"error","message":"serialization failure"}"#)
        })
    }
}
