//! Collaboration participants.

use super::value_object::{FieldPath, UserId};

/// 参加者に割り当てる表示色のパレット
pub const USER_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
];

/// パレットからランダムに色を選ぶ（重複は許容）
pub fn random_color() -> &'static str {
    let byte = uuid::Uuid::new_v4().as_bytes()[0];
    USER_COLORS[byte as usize % USER_COLORS.len()]
}

/// The identity a client joins a session with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl UserIdentity {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

/// Live cursor position, optionally anchored to a field
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub field_path: Option<FieldPath>,
}

/// One connected participant
#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub color: String,
    pub cursor: Option<Cursor>,
    /// Unix milliseconds of the last presence or cursor update
    pub last_seen: i64,
}

impl CollaborationUser {
    pub fn from_identity(identity: UserIdentity, color: impl Into<String>, now: i64) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            email: identity.email,
            avatar_url: identity.avatar_url,
            color: color.into(),
            cursor: None,
            last_seen: now,
        }
    }

    /// `last_seen` が staleness の閾値以内か
    pub fn is_active(&self, now: i64, staleness_ms: i64) -> bool {
        now.saturating_sub(self.last_seen) <= staleness_ms
    }
}
