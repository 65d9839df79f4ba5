//! Field edit propagator.
//!
//! Local edits are published and fed to the conflict detector. Remote edits
//! become the field's active-edit marker, which expires after the marker TTL
//! unless a newer edit of the same field replaced it.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    domain::{ChangeId, Cursor, FieldEdit, FieldPath},
    infrastructure::dto::{
        conversion::{cursor_move_payload, parse_cursor_move, parse_field_edit, to_payload},
        event,
        payload::FieldEditDto,
    },
};

use super::{
    engine::{Engine, Notification},
    service::CollaborationService,
};

impl CollaborationService {
    /// フィールドの編集をブロードキャストする
    ///
    /// セッションがない場合やフィールドパスが不正な場合は何もせず None を返す。
    pub async fn broadcast_field_edit(&self, field_path: &str, value: Value) -> Option<FieldEdit> {
        let field_path = match FieldPath::new(field_path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Ignoring field edit: {}", e);
                return None;
            }
        };
        let engine = &self.engine;
        let now = engine.now();
        let Some((edit, conflicts)) = engine.with_session(None, |s| {
            let edit = FieldEdit::local(&s.user, field_path, value, now);
            s.state.pending_changes.push(edit.clone());
            let conflicts = engine.detector.run(&mut s.state.pending_changes, now);
            (edit, conflicts)
        }) else {
            tracing::debug!("broadcast_field_edit called without an active session");
            return None;
        };

        engine
            .publish(event::FIELD_EDIT, to_payload(&FieldEditDto::from(&edit)))
            .await;
        if !conflicts.is_empty() {
            tracing::info!(
                "Conflict detected on '{}' ({} edits)",
                edit.field_path,
                conflicts.len()
            );
            engine.notify(vec![Notification::Conflict(conflicts)]);
        }
        Some(edit)
    }

    /// ローカルユーザーのカーソル位置をブロードキャストする
    pub async fn broadcast_cursor_move(&self, x: f64, y: f64, field_path: Option<&str>) {
        let field_path = match field_path.map(FieldPath::new).transpose() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Ignoring cursor move: {}", e);
                return;
            }
        };
        let cursor = Cursor { x, y, field_path };
        let now = self.engine.now();
        let Some(payload) = self.engine.with_session(None, |s| {
            s.user.cursor = Some(cursor.clone());
            s.user.last_seen = now;
            cursor_move_payload(&s.user.id, &cursor)
        }) else {
            tracing::debug!("broadcast_cursor_move called without an active session");
            return;
        };
        self.engine.publish(event::CURSOR_MOVE, payload).await;
    }
}

impl Engine {
    pub(crate) fn handle_field_edit(self: &Arc<Self>, epoch: u64, payload: Value) {
        let edit = match parse_field_edit(payload) {
            Ok(edit) => edit,
            Err(e) => {
                tracing::warn!("Dropping malformed field_edit: {}", e);
                return;
            }
        };
        let now = self.now();

        let outcome = self
            .with_session(Some(epoch), |s| {
                // 自分のブロードキャストのエコーは捨てる
                if edit.user_id == s.user.id {
                    return None;
                }
                s.state.set_marker(edit.clone());
                s.state.pending_changes.push(edit.clone());
                let conflicts = self.detector.run(&mut s.state.pending_changes, now);

                while s.timers.try_join_next().is_some() {}
                let engine = self.clone();
                let ttl = self.config.marker_ttl;
                let field_path = edit.field_path.clone();
                let change_id = edit.change_id.clone();
                s.timers.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    engine.expire_marker(epoch, &field_path, &change_id);
                });

                Some((conflicts, s.state.clone()))
            })
            .flatten();
        let Some((conflicts, state)) = outcome else {
            return;
        };

        tracing::debug!(
            "'{}' edited '{}' ({})",
            edit.user_id,
            edit.field_path,
            edit.change_id
        );
        let mut notifications = vec![Notification::FieldEdit(edit)];
        if !conflicts.is_empty() {
            tracing::info!("Conflict detected ({} edits)", conflicts.len());
            notifications.push(Notification::Conflict(conflicts));
        }
        notifications.push(Notification::StateChanged(state));
        self.notify(notifications);
    }

    /// マーカーがまだ同じ編集のものであれば削除する
    fn expire_marker(&self, epoch: u64, field_path: &FieldPath, change_id: &ChangeId) {
        let state = self
            .with_session(Some(epoch), |s| {
                s.state
                    .expire_marker(field_path, change_id)
                    .then(|| s.state.clone())
            })
            .flatten();
        if let Some(state) = state {
            tracing::debug!("Active-edit marker on '{}' expired", field_path);
            self.notify(vec![Notification::StateChanged(state)]);
        }
    }

    pub(crate) fn handle_cursor_move(&self, epoch: u64, payload: Value) {
        let cursor_move = match parse_cursor_move(payload) {
            Ok(cursor_move) => cursor_move,
            Err(e) => {
                tracing::warn!("Dropping malformed cursor_move: {}", e);
                return;
            }
        };
        let now = self.now();
        let updated = self
            .with_session(Some(epoch), |s| {
                if cursor_move.user_id == s.user.id {
                    return None;
                }
                s.state
                    .update_cursor(&cursor_move.user_id, cursor_move.cursor, now)
            })
            .flatten();
        if let Some(user) = updated {
            self.notify(vec![Notification::UserUpdated(user)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::{
        domain::{ChannelEvent, UserId},
        usecase::test_support::{Recorded, field_edit, hub_pair, scripted_session},
    };

    #[tokio::test]
    async fn test_own_edit_echo_is_discarded() {
        // テスト項目: 自分の編集のエコーでは on_field_edit が呼ばれず、マーカーも作られない
        // given (前提条件):
        let (alice, alice_events, bob, _bob_events, _clock) = hub_pair().await;
        let mut alice_events = alice_events;

        // when (操作):
        alice.broadcast_field_edit("price", json!(100)).await.unwrap();
        bob.lock_field("marker").await;

        // then (期待する結果):
        // bob のロックが届いた時点で、それより前に送られたエコーは処理済み
        alice_events
            .wait_for(|r| matches!(r, Recorded::StateChanged(s) if !s.active_edits.is_empty()))
            .await;
        let recorded = alice_events.drain();
        assert!(!recorded.iter().any(|r| matches!(r, Recorded::FieldEdit(_))));
        assert!(!alice.is_field_locked("price"));
    }

    #[tokio::test]
    async fn test_remote_edit_fires_on_field_edit() {
        // テスト項目: 他のユーザーの編集で on_field_edit が発火し、マーカーが設定される
        // given (前提条件):
        let (alice, _alice_events, bob, mut bob_events, _clock) = hub_pair().await;

        // when (操作):
        let sent = alice.broadcast_field_edit("price", json!(100)).await.unwrap();

        // then (期待する結果):
        let received = bob_events
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        assert_eq!(received, Recorded::FieldEdit(sent.clone()));
        assert!(bob.is_field_locked("price"));
        let editor = bob.get_field_editor("price").unwrap();
        assert_eq!(editor.user_id, UserId::new("alice").unwrap());
        assert_eq!(editor.value, json!(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_expires_after_ttl() {
        // テスト項目: リモートの編集マーカーは受信直後に存在し、3000ms 後に消える
        // given (前提条件):
        let (service, events, mut recorder, _clock) = scripted_session("alice").await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "price", 1_000, "bob-1000-a"),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        assert!(service.is_field_locked("price"));

        // when (操作):
        tokio::time::sleep(Duration::from_millis(2_999)).await;
        let before_ttl = service.is_field_locked("price");
        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;

        // then (期待する結果):
        assert!(before_ttl);
        assert!(!service.is_field_locked("price"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_timer_does_not_clear_newer_marker() {
        // テスト項目: 上書きされたマーカーは古い編集のタイマーでは消えず、新しい編集の TTL で消える
        // given (前提条件):
        let (service, events, mut recorder, _clock) = scripted_session("alice").await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "price", 1_000, "bob-1000-a"),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "price", 3_000, "bob-3000-b"),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;

        // when (操作):
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let after_first_ttl = service.get_field_editor("price");
        tokio::time::sleep(Duration::from_millis(1_600)).await;
        tokio::task::yield_now().await;

        // then (期待する結果):
        assert_eq!(after_first_ttl.unwrap().change_id.as_str(), "bob-3000-b");
        assert!(!service.is_field_locked("price"));
    }

    #[tokio::test]
    async fn test_local_edit_within_window_reports_conflict() {
        // テスト項目: リモートの編集から 1500ms 後のローカル編集で衝突が 1 回だけ通知される
        // given (前提条件):
        let (service, events, mut recorder, clock) = scripted_session("alice").await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "price", 1_000, "bob-1000-a"),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        clock.set(2_500);

        // when (操作):
        service.broadcast_field_edit("price", json!(5)).await.unwrap();

        // then (期待する結果):
        let recorded = recorder.drain();
        let conflicts: Vec<_> = recorded
            .iter()
            .filter_map(|r| match r {
                Recorded::Conflict(c) => Some(c.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(conflicts.len(), 1);
        let users: Vec<&str> = conflicts[0].iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["bob", "alice"]);
    }

    #[tokio::test]
    async fn test_local_edit_outside_window_reports_nothing() {
        // テスト項目: リモートの編集から 2500ms 後のローカル編集では衝突は通知されない
        // given (前提条件):
        let (service, events, mut recorder, clock) = scripted_session("alice").await;
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "price", 1_000, "bob-1000-a"),
            })
            .unwrap();
        recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        clock.set(3_500);

        // when (操作):
        service.broadcast_field_edit("price", json!(5)).await.unwrap();

        // then (期待する結果):
        let recorded = recorder.drain();
        assert!(!recorded.iter().any(|r| matches!(r, Recorded::Conflict(_))));
    }

    #[tokio::test]
    async fn test_same_user_edits_never_conflict() {
        // テスト項目: 同じユーザーによる 500ms 差の編集は衝突にならない
        // given (前提条件):
        let (service, _events, mut recorder, clock) = scripted_session("alice").await;
        service.broadcast_field_edit("price", json!(1)).await.unwrap();
        clock.advance(500);

        // when (操作):
        service.broadcast_field_edit("price", json!(2)).await.unwrap();

        // then (期待する結果):
        let recorded = recorder.drain();
        assert!(!recorded.iter().any(|r| matches!(r, Recorded::Conflict(_))));
        assert_eq!(service.get_state().pending_changes.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_field_edit_is_dropped() {
        // テスト項目: 不正な field_edit は捨てられ、後続のイベントは処理される
        // given (前提条件):
        let (service, events, mut recorder, _clock) = scripted_session("alice").await;

        // when (操作):
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: json!({"userId": "bob", "fieldPath": "price"}),
            })
            .unwrap();
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "name", 1_000, "bob-1000-a"),
            })
            .unwrap();

        // then (期待する結果):
        let received = recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        let Recorded::FieldEdit(edit) = received else {
            unreachable!()
        };
        assert_eq!(edit.field_path.as_str(), "name");
        assert!(!service.is_field_locked("price"));
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_edit_is_dropped() {
        // テスト項目: タイムスタンプが i64::MIN の field_edit は捨てられ、セッションは動き続ける
        // given (前提条件):
        let (service, events, mut recorder, _clock) = scripted_session("alice").await;

        // when (操作):
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "price", i64::MIN, "bob-min-a"),
            })
            .unwrap();
        events
            .send(ChannelEvent::Broadcast {
                event: "field_edit".to_string(),
                payload: field_edit("bob", "name", 1_000, "bob-1000-a"),
            })
            .unwrap();

        // then (期待する結果):
        let received = recorder
            .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
            .await;
        let Recorded::FieldEdit(edit) = received else {
            unreachable!()
        };
        assert_eq!(edit.field_path.as_str(), "name");
        assert!(!service.is_field_locked("price"));
        assert_eq!(service.get_state().pending_changes.len(), 1);
        assert!(service.broadcast_field_edit("price", json!(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_future_dated_edits_do_not_accumulate() {
        // テスト項目: 遠い未来のタイムスタンプを持つ編集も次の検出パスで取り除かれる
        // given (前提条件):
        let (service, events, mut recorder, clock) = scripted_session("alice").await;
        for i in 0..50 {
            events
                .send(ChannelEvent::Broadcast {
                    event: "field_edit".to_string(),
                    payload: field_edit("bob", "price", 10_000_000_000, &format!("bob-future-{}", i)),
                })
                .unwrap();
        }
        for _ in 0..50 {
            recorder
                .wait_for(|r| matches!(r, Recorded::FieldEdit(_)))
                .await;
        }
        clock.set(61_000);

        // when (操作):
        service.broadcast_field_edit("name", json!(1)).await.unwrap();

        // then (期待する結果):
        let pending = service.get_state().pending_changes;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, UserId::new("alice").unwrap());
    }

    #[tokio::test]
    async fn test_cursor_move_updates_local_user() {
        // テスト項目: ローカルのカーソル移動で current_user のカーソルが更新される
        // given (前提条件):
        let (service, _events, _recorder, _clock) = scripted_session("alice").await;

        // when (操作):
        service.broadcast_cursor_move(10.0, 20.0, Some("price")).await;

        // then (期待する結果):
        let cursor = service.current_user().unwrap().cursor.unwrap();
        assert_eq!((cursor.x, cursor.y), (10.0, 20.0));
        assert_eq!(cursor.field_path.unwrap().as_str(), "price");
    }
}
