//! Soft field-lock coordinator.
//!
//! Locks are advisory. A remote lock installs a lock marker in the same map
//! as live-edit markers; it has no TTL and is removed by the matching unlock.

use serde_json::Value;

use crate::{
    domain::{FieldEdit, FieldPath},
    infrastructure::dto::{
        conversion::{field_lock_payload, parse_field_lock},
        event,
    },
};

use super::{
    engine::{Engine, Notification},
    service::CollaborationService,
};

impl CollaborationService {
    /// フィールドのロックをブロードキャストする（セッションがなければ何もしない）
    pub async fn lock_field(&self, field_path: &str) {
        self.publish_lock(field_path, event::FIELD_LOCK).await;
    }

    /// フィールドのロック解除をブロードキャストする（セッションがなければ何もしない）
    pub async fn unlock_field(&self, field_path: &str) {
        self.publish_lock(field_path, event::FIELD_UNLOCK).await;
    }

    async fn publish_lock(&self, field_path: &str, event: &str) {
        let field_path = match FieldPath::new(field_path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", event, e);
                return;
            }
        };
        let now = self.engine.now();
        let Some(payload) = self
            .engine
            .with_session(None, |s| field_lock_payload(&s.user, &field_path, now))
        else {
            tracing::debug!("{} called without an active session", event);
            return;
        };
        self.engine.publish(event, payload).await;
    }
}

impl Engine {
    pub(crate) fn handle_field_lock(&self, epoch: u64, payload: Value, locked: bool) {
        let lock = match parse_field_lock(payload) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!("Dropping malformed lock event: {}", e);
                return;
            }
        };

        let state = self
            .with_session(Some(epoch), |s| {
                if lock.user_id == s.user.id {
                    return None;
                }
                if locked {
                    let user_name = lock
                        .user_name
                        .clone()
                        .or_else(|| s.state.users.get(&lock.user_id).map(|u| u.name.clone()))
                        .unwrap_or_else(|| lock.user_id.to_string());
                    s.state.set_marker(FieldEdit::lock_marker(
                        lock.user_id.clone(),
                        user_name,
                        lock.field_path.clone(),
                        lock.timestamp,
                    ));
                } else if !s.state.release_lock(&lock.field_path, &lock.user_id) {
                    // 別ユーザーの編集マーカーで上書きされていた場合、そのマーカーは残る
                    return None;
                }
                Some(s.state.clone())
            })
            .flatten();

        if let Some(state) = state {
            tracing::debug!(
                "'{}' {} '{}'",
                lock.user_id,
                if locked { "locked" } else { "unlocked" },
                lock.field_path
            );
            self.notify(vec![Notification::StateChanged(state)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        domain::{ChannelEvent, UserId},
        usecase::test_support::{Recorded, field_edit, hub_pair, scripted_session},
    };

    #[tokio::test]
    async fn test_lock_unlock_symmetry() {
        // テスト項目: リモートのロックで is_field_locked が true になり、ロック解除で即座に戻る
        // given (前提条件):
        let (alice, mut alice_events, bob, _bob_events, _clock) = hub_pair().await;

        // when (操作):
        bob.lock_field("name").await;
        alice_events
            .wait_for(|r| matches!(r, Recorded::StateChanged(s) if !s.active_edits.is_empty()))
            .await;
        let locked = alice.is_field_locked("name");
        let editor = alice.get_field_editor("name");
        bob.unlock_field("name").await;
        alice_events
            .wait_for(|r| matches!(r, Recorded::StateChanged(s) if s.active_edits.is_empty()))
            .await;

        // then (期待する結果):
        assert!(locked);
        let editor = editor.unwrap();
        assert_eq!(editor.user_id, UserId::new("bob").unwrap());
        assert_eq!(editor.user_name, "Bob");
        assert!(editor.is_lock_marker());
        assert!(!alice.is_field_locked("name"));
        assert!(alice.get_field_editor("name").is_none());
    }

    #[tokio::test]
    async fn test_own_lock_is_ignored() {
        // テスト項目: 自分のロックのエコーではマーカーは作られない
        // given (前提条件):
        let (alice, mut alice_events, bob, _bob_events, _clock) = hub_pair().await;

        // when (操作):
        alice.lock_field("name").await;
        bob.lock_field("price").await;

        // then (期待する結果):
        alice_events
            .wait_for(|r| matches!(r, Recorded::StateChanged(s) if !s.active_edits.is_empty()))
            .await;
        assert!(!alice.is_field_locked("name"));
        assert!(alice.is_field_locked("price"));
    }

    #[tokio::test]
    async fn test_unlock_by_other_user_keeps_lock() {
        // テスト項目: ロックを持っていないユーザーのロック解除ではロックは外れない
        // given (前提条件):
        let (service, events, mut recorder, _clock) = scripted_session("alice").await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_lock".to_string(),
                payload: json!({"userId": "bob", "userName": "Bob", "fieldPath": "name", "timestamp": 1}),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::StateChanged(_)))
            .await;

        // when (操作):
        events
            .send(ChannelEvent::Broadcast {
                event: "field_unlock".to_string(),
                payload: json!({"userId": "carol", "fieldPath": "name", "timestamp": 2}),
            })
            .unwrap();
        events
            .send(ChannelEvent::Broadcast {
                event: "field_lock".to_string(),
                payload: json!({"userId": "carol", "fieldPath": "other", "timestamp": 3}),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::StateChanged(s) if s.active_edits.len() == 2))
            .await;

        // then (期待する結果):
        assert_eq!(
            service.get_field_editor("name").unwrap().user_id,
            UserId::new("bob").unwrap()
        );
        assert_eq!(
            service.get_field_editor("other").unwrap().user_name,
            "carol"
        );
    }

    #[tokio::test]
    async fn test_unlock_keeps_superseding_edit_marker() {
        // テスト項目: ロック後に別ユーザーの編集でマーカーが上書きされた場合、元の持ち主のロック解除では消えない
        // given (前提条件):
        let (service, events, mut recorder, _clock) = scripted_session("alice").await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_lock".to_string(),
                payload: json!({"userId": "bob", "fieldPath": "name", "timestamp": 1000}),
            })
            .unwrap();
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("carol", "name", 1_000, "carol-1000-a"),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;

        // when (操作):
        events
            .send(ChannelEvent::Broadcast {
                event: "field_unlock".to_string(),
                payload: json!({"userId": "bob", "fieldPath": "name", "timestamp": 1001}),
            })
            .unwrap();
        events
            .send(ChannelEvent::Broadcast {
                event: "field_lock".to_string(),
                payload: json!({"userId": "bob", "fieldPath": "other", "timestamp": 1002}),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::StateChanged(s) if s.active_edits.len() == 2))
            .await;

        // then (期待する結果):
        let editor = service.get_field_editor("name").unwrap();
        assert_eq!(editor.user_id, UserId::new("carol").unwrap());
        assert!(!editor.is_lock_marker());
    }

    #[tokio::test]
    async fn test_lock_without_session_is_noop() {
        // テスト項目: セッションがない状態でのロックは何もしない
        // given (前提条件):
        let (service, _events, _recorder, _clock) = scripted_session("alice").await;
        service.leave_session().await;

        // when (操作):
        service.lock_field("name").await;

        // then (期待する結果):
        assert!(!service.is_active());
        assert!(!service.is_field_locked("name"));
    }
}
