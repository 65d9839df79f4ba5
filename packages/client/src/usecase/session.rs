//! Session manager: join, leave and the per-session event loop.

use std::sync::Arc;

use tokio::time::{Instant, interval_at};

use crate::{
    domain::{
        ChannelEvent, ChannelSubscription, CollaborationError, CollaborationState,
        CollaborationUser, ConnectionStatus, RoomId, UserIdentity, user::random_color,
    },
    infrastructure::dto::{conversion::to_payload, event, payload::PresenceDto},
};

use super::{
    engine::{Engine, Notification, Session},
    service::CollaborationService,
};

impl CollaborationService {
    /// Room のセッションに参加する
    ///
    /// 既にセッションがある場合は先に退出する。presence はチャンネルの
    /// Subscribed を受け取ってから登録される。
    ///
    /// # Returns
    ///
    /// * `Ok(CollaborationUser)` - 参加したローカルユーザー（割り当てられた色を含む）
    /// * `Err(CollaborationError)` - チャンネルへの参加に失敗した
    pub async fn join_organization_session(
        &self,
        room_id: RoomId,
        identity: UserIdentity,
    ) -> Result<CollaborationUser, CollaborationError> {
        let _lifecycle = self.engine.lifecycle.lock().await;
        if self.engine.teardown().await {
            tracing::info!("Re-joining: previous session was torn down");
        }

        let user = CollaborationUser::from_identity(identity, random_color(), self.engine.now());
        let events = self.engine.channel.subscribe(&room_id, &user.id).await?;

        let epoch = self.engine.next_epoch();
        self.engine
            .install_session(Session::new(epoch, room_id.clone(), user.clone()));
        let handle = tokio::spawn(run_event_loop(self.engine.clone(), epoch, events));
        self.engine
            .with_session(Some(epoch), |s| s.event_loop = Some(handle));

        tracing::info!(
            "'{}' joined room '{}' (session {})",
            user.id,
            room_id,
            epoch
        );
        Ok(user)
    }

    /// セッションから退出し、状態を空に戻す（セッションがなければ何もしない）
    pub async fn leave_session(&self) {
        let _lifecycle = self.engine.lifecycle.lock().await;
        if !self.engine.teardown().await {
            tracing::debug!("leave_session called without an active session");
        }
    }
}

impl Engine {
    /// セッションを破棄する。破棄したセッションがあれば true
    ///
    /// イベントループとタイマーを先に止めてから、presence の削除と退出を行う。
    pub(crate) async fn teardown(&self) -> bool {
        let Some(session) = self.take_session() else {
            return false;
        };
        let was_subscribed = session.subscribed;
        let room_id = session.room_id.clone();
        drop(session);

        if was_subscribed && let Err(e) = self.channel.untrack().await {
            tracing::warn!("Failed to untrack presence: {}", e);
        }
        if let Err(e) = self.channel.unsubscribe().await {
            tracing::warn!("Failed to unsubscribe from room '{}': {}", room_id, e);
        }
        tracing::info!("Left room '{}'", room_id);

        self.notify(vec![Notification::StateChanged(CollaborationState::new())]);
        true
    }

    pub(crate) async fn handle_event(self: &Arc<Self>, epoch: u64, event: ChannelEvent) {
        match event {
            ChannelEvent::Status(ConnectionStatus::Subscribed) => self.on_subscribed(epoch).await,
            ChannelEvent::Status(status) => {
                tracing::warn!("Channel status changed: {:?}", status);
                if self
                    .with_session(Some(epoch), |s| s.subscribed = false)
                    .is_some()
                {
                    self.notify(vec![Notification::Status(status)]);
                }
            }
            ChannelEvent::PresenceSync(records) => self.handle_presence_sync(epoch, records),
            ChannelEvent::PresenceJoin(record) => self.handle_presence_join(epoch, record),
            ChannelEvent::PresenceLeave(record) => self.handle_presence_leave(epoch, &record),
            ChannelEvent::Broadcast { event, payload } => match event.as_str() {
                event::FIELD_EDIT => self.handle_field_edit(epoch, payload),
                event::CURSOR_MOVE => self.handle_cursor_move(epoch, payload),
                event::FIELD_LOCK => self.handle_field_lock(epoch, payload, true),
                event::FIELD_UNLOCK => self.handle_field_lock(epoch, payload, false),
                other => tracing::debug!("Ignoring unknown broadcast event '{}'", other),
            },
        }
    }

    /// Subscribed を受け取ってから presence を登録し、heartbeat を開始する
    async fn on_subscribed(self: &Arc<Self>, epoch: u64) {
        let Some(presence) = self.with_session(Some(epoch), |s| {
            s.subscribed = true;
            to_payload(&PresenceDto::from(&s.user))
        }) else {
            return;
        };
        self.track_presence(presence).await;
        self.notify(vec![Notification::Status(ConnectionStatus::Subscribed)]);
        self.start_heartbeat(epoch);
    }

    pub(crate) async fn track_presence(&self, presence: serde_json::Value) {
        if let Err(e) = self.channel.track(presence).await {
            self.report_channel_error("track presence", e);
        }
    }

    /// 定期的に presence を登録し直し、他のクライアントの last_seen を更新する
    fn start_heartbeat(self: &Arc<Self>, epoch: u64) {
        let Some(period) = self.config.heartbeat_interval else {
            return;
        };
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let now = engine.now();
                let presence = engine
                    .with_session(Some(epoch), |s| {
                        s.user.last_seen = now;
                        s.subscribed.then(|| to_payload(&PresenceDto::from(&s.user)))
                    });
                match presence {
                    Some(Some(presence)) => engine.track_presence(presence).await,
                    Some(None) => tracing::debug!("Skipping heartbeat while not subscribed"),
                    None => break,
                }
            }
        });
        if let Some(Some(previous)) = self.with_session(Some(epoch), |s| s.heartbeat.replace(handle))
        {
            previous.abort();
        }
    }
}

/// 1 セッション分のイベントを順番に処理する
async fn run_event_loop(engine: Arc<Engine>, epoch: u64, mut events: ChannelSubscription) {
    while let Some(event) = events.recv().await {
        if !engine.is_current(epoch) {
            tracing::debug!("Discarding event for finished session {}", epoch);
            break;
        }
        engine.handle_event(epoch, event).await;
    }
    tracing::debug!("Event loop of session {} finished", epoch);
}
