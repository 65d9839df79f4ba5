//! Conversion logic between payload DTOs and domain entities.
//!
//! Incoming payloads are untrusted: every conversion from JSON validates the
//! shape and the value objects, and returns an error instead of panicking.

use serde_json::Value;

use crate::domain::{ChangeId, CollaborationUser, Cursor, DomainError, FieldEdit, FieldPath, UserId};

use super::payload::{CursorDto, CursorMoveDto, FieldEditDto, FieldLockDto, PresenceDto};

/// 受信したペイロードの変換エラー
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Cursor> for CursorDto {
    fn from(cursor: &Cursor) -> Self {
        Self {
            x: cursor.x,
            y: cursor.y,
            field_path: cursor.field_path.as_ref().map(|p| p.as_str().to_string()),
        }
    }
}

impl From<&CollaborationUser> for PresenceDto {
    fn from(user: &CollaborationUser) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
            color: user.color.clone(),
            cursor: user.cursor.as_ref().map(CursorDto::from),
            last_seen: user.last_seen,
        }
    }
}

impl From<&FieldEdit> for FieldEditDto {
    fn from(edit: &FieldEdit) -> Self {
        Self {
            user_id: edit.user_id.as_str().to_string(),
            user_name: edit.user_name.clone(),
            field_path: edit.field_path.as_str().to_string(),
            value: edit.value.clone(),
            timestamp: edit.timestamp,
            change_id: edit.change_id.as_str().to_string(),
        }
    }
}

/// ドメインモデルを JSON に変換する（ペイロードは文字列と数値のみなので失敗しない）
pub fn to_payload<T: serde::Serialize>(dto: &T) -> Value {
    serde_json::to_value(dto).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize payload: {}", e);
        Value::Null
    })
}

// ========================================
// JSON → Domain Entity
// ========================================

/// 受け付けるタイムスタンプの上限（9999-12-31T23:59:59.999Z の Unix ミリ秒）
pub const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

/// Unix ミリ秒として扱える範囲か検証する
pub fn validate_timestamp(timestamp: i64) -> Result<i64, DomainError> {
    if (0..=MAX_TIMESTAMP_MS).contains(&timestamp) {
        Ok(timestamp)
    } else {
        Err(DomainError::InvalidTimestamp(timestamp))
    }
}

impl TryFrom<CursorDto> for Cursor {
    type Error = DomainError;

    fn try_from(dto: CursorDto) -> Result<Self, Self::Error> {
        Ok(Self {
            x: dto.x,
            y: dto.y,
            field_path: dto.field_path.map(FieldPath::new).transpose()?,
        })
    }
}

impl TryFrom<PresenceDto> for CollaborationUser {
    type Error = DomainError;

    fn try_from(dto: PresenceDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(&dto.id)?,
            name: dto.name,
            email: dto.email,
            avatar_url: dto.avatar_url,
            color: dto.color,
            cursor: dto.cursor.map(Cursor::try_from).transpose()?,
            last_seen: validate_timestamp(dto.last_seen)?,
        })
    }
}

impl TryFrom<FieldEditDto> for FieldEdit {
    type Error = DomainError;

    fn try_from(dto: FieldEditDto) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(&dto.user_id)?,
            user_name: dto.user_name,
            field_path: FieldPath::new(&dto.field_path)?,
            value: dto.value,
            timestamp: validate_timestamp(dto.timestamp)?,
            change_id: ChangeId::new(&dto.change_id)?,
        })
    }
}

/// Parsed `cursor_move` payload
#[derive(Debug, Clone, PartialEq)]
pub struct CursorMove {
    pub user_id: UserId,
    pub cursor: Cursor,
}

/// Parsed `field_lock` / `field_unlock` payload
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLock {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub field_path: FieldPath,
    pub timestamp: i64,
}

pub fn parse_presence(value: Value) -> Result<CollaborationUser, PayloadError> {
    let dto: PresenceDto = serde_json::from_value(value)?;
    Ok(CollaborationUser::try_from(dto)?)
}

/// presence_leave では id だけを使う
pub fn parse_presence_id(value: &Value) -> Result<UserId, PayloadError> {
    #[derive(serde::Deserialize)]
    struct IdOnly {
        id: String,
    }
    let dto: IdOnly = serde_json::from_value(value.clone())?;
    Ok(UserId::new(&dto.id)?)
}

pub fn parse_field_edit(value: Value) -> Result<FieldEdit, PayloadError> {
    let dto: FieldEditDto = serde_json::from_value(value)?;
    Ok(FieldEdit::try_from(dto)?)
}

pub fn parse_cursor_move(value: Value) -> Result<CursorMove, PayloadError> {
    let dto: CursorMoveDto = serde_json::from_value(value)?;
    Ok(CursorMove {
        user_id: UserId::new(&dto.user_id)?,
        cursor: Cursor::try_from(dto.cursor)?,
    })
}

pub fn parse_field_lock(value: Value) -> Result<FieldLock, PayloadError> {
    let dto: FieldLockDto = serde_json::from_value(value)?;
    Ok(FieldLock {
        user_id: UserId::new(&dto.user_id)?,
        user_name: dto.user_name,
        field_path: FieldPath::new(&dto.field_path)?,
        timestamp: validate_timestamp(dto.timestamp)?,
    })
}

pub fn field_lock_payload(
    user: &CollaborationUser,
    field_path: &FieldPath,
    timestamp: i64,
) -> Value {
    to_payload(&FieldLockDto {
        user_id: user.id.as_str().to_string(),
        user_name: Some(user.name.clone()),
        field_path: field_path.as_str().to_string(),
        timestamp,
    })
}

pub fn cursor_move_payload(user_id: &UserId, cursor: &Cursor) -> Value {
    to_payload(&CursorMoveDto {
        user_id: user_id.as_str().to_string(),
        cursor: CursorDto::from(cursor),
    })
}
