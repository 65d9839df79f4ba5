//! Value Object 定義
//!
//! 前後の空白を取り除いた上で、空でないこと・長さ制限をコンストラクタで検証します。
//! RoomId と UserId は接続 URL のクエリにそのまま載るため、使用可能な文字も制限します。

use std::fmt;

use super::error::DomainError;

/// ID として使用できる最大文字数
pub const MAX_ID_LENGTH: usize = 128;

/// フィールドパスとして使用できる最大文字数
pub const MAX_FIELD_PATH_LENGTH: usize = 256;

fn normalize(value: &str, max: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("must not be empty".to_string());
    }
    let length = trimmed.chars().count();
    if length > max {
        return Err(format!("must be at most {} characters (got {})", max, length));
    }
    Ok(trimmed.to_string())
}

fn normalize_id(value: &str) -> Result<String, String> {
    let normalized = normalize(value, MAX_ID_LENGTH)?;
    if let Some(c) = normalized
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '@')))
    {
        return Err(format!("contains invalid character '{}'", c));
    }
    Ok(normalized)
}

macro_rules! string_accessors {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// User ID（コラボレーションの参加者を識別する）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        normalize_id(value.as_ref())
            .map(Self)
            .map_err(DomainError::InvalidUserId)
    }
}

string_accessors!(UserId);

/// Room ID（組織やレコード単位のコラボレーション空間）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        normalize_id(value.as_ref())
            .map(Self)
            .map_err(DomainError::InvalidRoomId)
    }
}

string_accessors!(RoomId);

/// Field path（編集対象のフィールド、例: `price`, `items[0].name`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        normalize(value.as_ref(), MAX_FIELD_PATH_LENGTH)
            .map(Self)
            .map_err(DomainError::InvalidFieldPath)
    }
}

string_accessors!(FieldPath);

/// Change ID（`<userId>-<timestamp>-<random>`、ロックの場合は `lock-<userId>-<timestamp>`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeId(String);

const LOCK_PREFIX: &str = "lock-";

impl ChangeId {
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        normalize(value.as_ref(), MAX_ID_LENGTH * 2)
            .map(Self)
            .map_err(DomainError::InvalidChangeId)
    }

    /// 新しい編集用の Change ID を生成する
    pub fn generate(user_id: &UserId, timestamp: i64) -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}-{}", user_id, timestamp, &random[..9]))
    }

    /// ロックのマーカー用 Change ID
    pub fn for_lock(user_id: &UserId, timestamp: i64) -> Self {
        Self(format!("{}{}-{}", LOCK_PREFIX, user_id, timestamp))
    }

    pub fn is_lock(&self) -> bool {
        self.0.starts_with(LOCK_PREFIX)
    }
}

string_accessors!(ChangeId);
