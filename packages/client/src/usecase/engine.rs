//! Shared engine state behind `CollaborationService`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::{sync::Mutex as AsyncMutex, task::JoinHandle, task::JoinSet};

use tandem_shared::time::Clock;

use crate::domain::{
    BroadcastChannel, ChannelError, CollaborationConfig, CollaborationListener,
    CollaborationState, CollaborationUser, ConflictDetector, ConnectionStatus, FieldEdit, RoomId,
    UserId,
};

/// One joined room
pub(crate) struct Session {
    pub(crate) epoch: u64,
    pub(crate) room_id: RoomId,
    /// The local user, mirrored outside the directory
    pub(crate) user: CollaborationUser,
    pub(crate) state: CollaborationState,
    pub(crate) subscribed: bool,
    pub(crate) event_loop: Option<JoinHandle<()>>,
    pub(crate) heartbeat: Option<JoinHandle<()>>,
    /// Active-edit marker expiry timers
    pub(crate) timers: JoinSet<()>,
}

impl Session {
    pub(crate) fn new(epoch: u64, room_id: RoomId, user: CollaborationUser) -> Self {
        Self {
            epoch,
            room_id,
            user,
            state: CollaborationState::new(),
            subscribed: false,
            event_loop: None,
            heartbeat: None,
            timers: JoinSet::new(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // timers は JoinSet の drop で abort される
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }
}

/// Listener に渡す通知（状態のロックを外してから配送する）
#[derive(Debug, Clone)]
pub(crate) enum Notification {
    UserJoined(CollaborationUser),
    UserLeft(UserId),
    UserUpdated(CollaborationUser),
    FieldEdit(FieldEdit),
    Conflict(Vec<FieldEdit>),
    StateChanged(CollaborationState),
    Status(ConnectionStatus),
}

pub(crate) struct Engine {
    pub(crate) channel: Arc<dyn BroadcastChannel>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: CollaborationConfig,
    pub(crate) detector: ConflictDetector,
    session: Mutex<Option<Session>>,
    listeners: RwLock<Vec<Arc<dyn CollaborationListener>>>,
    next_epoch: Mutex<u64>,
    /// join / leave を直列化する
    pub(crate) lifecycle: AsyncMutex<()>,
}

impl Engine {
    pub(crate) fn new(
        channel: Arc<dyn BroadcastChannel>,
        clock: Arc<dyn Clock>,
        config: CollaborationConfig,
    ) -> Self {
        let detector = ConflictDetector::new(config.conflict_window_ms, config.pending_retention_ms);
        Self {
            channel,
            clock,
            config,
            detector,
            session: Mutex::new(None),
            listeners: RwLock::new(Vec::new()),
            next_epoch: Mutex::new(0),
            lifecycle: AsyncMutex::new(()),
        }
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_epoch(&self) -> u64 {
        let mut epoch = self.next_epoch.lock().unwrap_or_else(PoisonError::into_inner);
        *epoch += 1;
        *epoch
    }

    pub(crate) fn install_session(&self, session: Session) {
        *self.lock_session() = Some(session);
    }

    pub(crate) fn take_session(&self) -> Option<Session> {
        self.lock_session().take()
    }

    /// 現在のセッションに対して `f` を実行する
    ///
    /// `epoch` を指定した場合、セッションが入れ替わっていれば実行しない。
    pub(crate) fn with_session<R>(
        &self,
        epoch: Option<u64>,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let mut guard = self.lock_session();
        let session = guard.as_mut()?;
        if epoch.is_some_and(|e| e != session.epoch) {
            return None;
        }
        Some(f(session))
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.with_session(Some(epoch), |_| ()).is_some()
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn CollaborationListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub(crate) fn notify(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for notification in &notifications {
            for listener in &listeners {
                match notification {
                    Notification::UserJoined(user) => listener.on_user_joined(user),
                    Notification::UserLeft(user_id) => listener.on_user_left(user_id),
                    Notification::UserUpdated(user) => listener.on_user_updated(user),
                    Notification::FieldEdit(edit) => listener.on_field_edit(edit),
                    Notification::Conflict(conflicts) => listener.on_conflict_detected(conflicts),
                    Notification::StateChanged(state) => listener.on_state_changed(state),
                    Notification::Status(status) => listener.on_connection_status(status),
                }
            }
        }
    }

    /// 伝送路のエラーはログと接続状態の通知で報告し、呼び出し元には返さない
    pub(crate) fn report_channel_error(&self, action: &str, error: ChannelError) {
        tracing::warn!("Failed to {}: {}", action, error);
        self.notify(vec![Notification::Status(ConnectionStatus::Error(
            error.to_string(),
        ))]);
    }

    pub(crate) async fn publish(&self, event: &str, payload: serde_json::Value) {
        if let Err(e) = self.channel.publish(event, payload).await {
            self.report_channel_error(&format!("publish '{}'", event), e);
        }
    }
}
