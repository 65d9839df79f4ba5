//! Test helpers for the usecase layer.

use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};
use tandem_shared::time::ManualClock;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ChannelEvent, CollaborationConfig, CollaborationListener, CollaborationState,
        CollaborationUser, ConnectionStatus, FieldEdit, RoomId, UserId, UserIdentity,
        channel::MockBroadcastChannel,
    },
    infrastructure::channel::InMemoryHub,
};

use super::CollaborationService;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Listener に届いた通知の記録
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recorded {
    Joined(UserId),
    Left(UserId),
    Updated(UserId),
    FieldEdit(FieldEdit),
    Conflict(Vec<FieldEdit>),
    StateChanged(CollaborationState),
    Status(ConnectionStatus),
}

struct RecordingListener {
    tx: mpsc::UnboundedSender<Recorded>,
}

impl RecordingListener {
    fn record(&self, recorded: Recorded) {
        let _ = self.tx.send(recorded);
    }
}

impl CollaborationListener for RecordingListener {
    fn on_user_joined(&self, user: &CollaborationUser) {
        self.record(Recorded::Joined(user.id.clone()));
    }

    fn on_user_left(&self, user_id: &UserId) {
        self.record(Recorded::Left(user_id.clone()));
    }

    fn on_user_updated(&self, user: &CollaborationUser) {
        self.record(Recorded::Updated(user.id.clone()));
    }

    fn on_field_edit(&self, edit: &FieldEdit) {
        self.record(Recorded::FieldEdit(edit.clone()));
    }

    fn on_conflict_detected(&self, conflicts: &[FieldEdit]) {
        self.record(Recorded::Conflict(conflicts.to_vec()));
    }

    fn on_state_changed(&self, state: &CollaborationState) {
        self.record(Recorded::StateChanged(state.clone()));
    }

    fn on_connection_status(&self, status: &ConnectionStatus) {
        self.record(Recorded::Status(status.clone()));
    }
}

/// 記録された通知を順番に受け取る
pub(crate) struct Recorder {
    rx: mpsc::UnboundedReceiver<Recorded>,
}

impl Recorder {
    fn attach(service: &CollaborationService) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        service.add_listener(Arc::new(RecordingListener { tx }));
        Self { rx }
    }

    /// `pred` を満たす通知が届くまで待つ（それまでの通知は読み捨てる）
    pub(crate) async fn wait_for(&mut self, pred: impl Fn(&Recorded) -> bool) -> Recorded {
        let result = tokio::time::timeout(WAIT_TIMEOUT, async {
            while let Some(recorded) = self.rx.recv().await {
                if pred(&recorded) {
                    return Some(recorded);
                }
            }
            None
        })
        .await;
        match result {
            Ok(Some(recorded)) => recorded,
            Ok(None) => panic!("listener channel closed"),
            Err(_) => panic!("timed out waiting for a listener notification"),
        }
    }

    /// 既に届いている通知をすべて取り出す
    pub(crate) fn drain(&mut self) -> Vec<Recorded> {
        let mut recorded = Vec::new();
        while let Ok(r) = self.rx.try_recv() {
            recorded.push(r);
        }
        recorded
    }
}

fn display_name(user_id: &str) -> String {
    let mut chars = user_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn identity(user_id: &str) -> UserIdentity {
    UserIdentity::new(
        UserId::new(user_id).unwrap(),
        display_name(user_id),
        format!("{}@example.com", user_id),
    )
}

pub(crate) fn room() -> RoomId {
    RoomId::new("org-1").unwrap()
}

/// presence レコードの JSON
pub(crate) fn presence(user_id: &str, last_seen: i64) -> Value {
    json!({
        "id": user_id,
        "name": display_name(user_id),
        "email": format!("{}@example.com", user_id),
        "color": "#3B82F6",
        "lastSeen": last_seen,
    })
}

/// field_edit ペイロードの JSON
pub(crate) fn field_edit(user_id: &str, field_path: &str, timestamp: i64, change_id: &str) -> Value {
    json!({
        "userId": user_id,
        "userName": display_name(user_id),
        "fieldPath": field_path,
        "value": timestamp,
        "timestamp": timestamp,
        "changeId": change_id,
    })
}

/// 何でも受け付けるモックチャンネルで参加済みのセッション
///
/// 返り値の sender からチャンネルのイベントを直接流し込める。時計は 1000ms
/// から始まり、heartbeat は無効。
pub(crate) async fn scripted_session(
    user_id: &str,
) -> (
    CollaborationService,
    mpsc::UnboundedSender<ChannelEvent>,
    Recorder,
    ManualClock,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut channel = MockBroadcastChannel::new();
    channel.expect_subscribe().return_once(move |_, _| Ok(rx));
    channel.expect_track().returning(|_| Ok(()));
    channel.expect_untrack().returning(|| Ok(()));
    channel.expect_publish().returning(|_, _| Ok(()));
    channel.expect_unsubscribe().returning(|| Ok(()));

    let clock = ManualClock::new(1_000);
    let service = CollaborationService::new(
        Arc::new(channel),
        Arc::new(clock.clone()),
        CollaborationConfig::default().with_heartbeat_interval(None),
    );
    let mut recorder = Recorder::attach(&service);
    service
        .join_organization_session(room(), identity(user_id))
        .await
        .unwrap();
    tx.send(ChannelEvent::Status(ConnectionStatus::Subscribed))
        .unwrap();
    recorder
        .wait_for(|r| matches!(r, Recorded::Status(ConnectionStatus::Subscribed)))
        .await;
    recorder.drain();
    (service, tx, recorder, clock)
}

/// ハブに接続して参加済みのセッション
pub(crate) async fn hub_session(
    hub: &InMemoryHub,
    user_id: &str,
    clock: &ManualClock,
    config: CollaborationConfig,
) -> (CollaborationService, Recorder) {
    let service = CollaborationService::new(
        Arc::new(hub.channel()),
        Arc::new(clock.clone()),
        config,
    );
    let mut recorder = Recorder::attach(&service);
    service
        .join_organization_session(room(), identity(user_id))
        .await
        .unwrap();
    recorder
        .wait_for(|r| matches!(r, Recorded::Status(ConnectionStatus::Subscribed)))
        .await;
    (service, recorder)
}

/// 同じハブで互いの presence が見えている alice と bob
pub(crate) async fn hub_pair() -> (
    CollaborationService,
    Recorder,
    CollaborationService,
    Recorder,
    ManualClock,
) {
    let hub = InMemoryHub::new();
    let clock = ManualClock::new(1_000);
    let config = CollaborationConfig::default().with_heartbeat_interval(None);
    let (alice, mut alice_events) = hub_session(&hub, "alice", &clock, config.clone()).await;
    let (bob, mut bob_events) = hub_session(&hub, "bob", &clock, config).await;

    let bob_id = UserId::new("bob").unwrap();
    let alice_id = UserId::new("alice").unwrap();
    alice_events
        .wait_for(|r| *r == Recorded::Joined(bob_id.clone()))
        .await;
    bob_events
        .wait_for(|r| matches!(r, Recorded::StateChanged(s) if s.users.contains_key(&alice_id)))
        .await;
    alice_events.drain();
    bob_events.drain();
    (alice, alice_events, bob, bob_events, clock)
}
