//! Conversion logic between DTOs and domain entities.

use tandem_shared::time::timestamp_to_jst_rfc3339;

use crate::domain::{Member, PresenceEntry, Room};
use crate::infrastructure::dto::{http, websocket as ws};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<PresenceEntry> for ws::PresenceEntryDto {
    fn from(entry: PresenceEntry) -> Self {
        Self {
            key: entry.user_id.into_string(),
            presence: entry.presence,
        }
    }
}

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .members
                .iter()
                .map(|m| m.id.as_str().to_string())
                .collect(),
            created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
        }
    }
}

impl From<Member> for http::MemberDetailDto {
    fn from(member: Member) -> Self {
        Self {
            user_id: member.id.into_string(),
            connected_at: timestamp_to_jst_rfc3339(member.connected_at.value()),
            presence: member.presence,
        }
    }
}

impl From<Room> for http::RoomDetailDto {
    fn from(room: Room) -> Self {
        let member_capacity = room.member_capacity();
        Self {
            id: room.id.into_string(),
            members: room.members.into_iter().map(Into::into).collect(),
            member_capacity,
            created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
        }
    }
}

/// presence スナップショットを presence_sync フレームに変換
pub fn presence_sync_frame(entries: Vec<PresenceEntry>) -> ws::ServerFrame {
    ws::ServerFrame::PresenceSync {
        presences: entries.into_iter().map(Into::into).collect(),
    }
}
