//! camelCase payloads shared by every client in a room.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorDto {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

/// Presence record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorDto>,
    pub last_seen: i64,
}

/// `field_edit` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEditDto {
    pub user_id: String,
    pub user_name: String,
    pub field_path: String,
    #[serde(default)]
    pub value: Value,
    pub timestamp: i64,
    pub change_id: String,
}

/// `cursor_move` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveDto {
    pub user_id: String,
    pub cursor: CursorDto,
}

/// `field_lock` / `field_unlock` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLockDto {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub field_path: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presence_wire_format_is_camel_case() {
        // テスト項目: presence レコードは camelCase で、未設定の項目は省略される
        // given (前提条件):
        let presence = PresenceDto {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar_url: Some("https://example.com/a.png".to_string()),
            color: "#FF6B6B".to_string(),
            cursor: None,
            last_seen: 1_000,
        };

        // when (操作):
        let value = serde_json::to_value(&presence).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "id": "alice",
                "name": "Alice",
                "email": "alice@example.com",
                "avatarUrl": "https://example.com/a.png",
                "color": "#FF6B6B",
                "lastSeen": 1000
            })
        );
    }

    #[test]
    fn test_field_lock_without_user_name() {
        // テスト項目: userName のない field_lock も解釈できる
        // given (前提条件):
        let value = json!({"userId": "bob", "fieldPath": "name", "timestamp": 5});

        // when (操作):
        let lock: FieldLockDto = serde_json::from_value(value).unwrap();

        // then (期待する結果):
        assert_eq!(lock.user_name, None);
        assert_eq!(lock.field_path, "name");
    }
}
