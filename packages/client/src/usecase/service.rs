//! CollaborationService: the public entry point of the engine.

use std::sync::Arc;

use tandem_shared::time::Clock;

use crate::domain::{
    BroadcastChannel, CollaborationConfig, CollaborationListener, CollaborationState,
    CollaborationUser, FieldEdit, FieldPath, RoomId,
};

use super::engine::Engine;

/// Real-time field collaboration for one client
///
/// ## 使用例
///
/// ```ignore
/// let service = CollaborationService::new(channel, Arc::new(SystemClock), CollaborationConfig::default());
/// service.add_listener(Arc::new(PrintingListener::new(user_id)));
/// service.join_organization_session(room_id, identity).await?;
/// service.broadcast_field_edit("price", json!(100)).await;
/// service.leave_session().await;
/// ```
pub struct CollaborationService {
    pub(super) engine: Arc<Engine>,
}

impl CollaborationService {
    pub fn new(
        channel: Arc<dyn BroadcastChannel>,
        clock: Arc<dyn Clock>,
        config: CollaborationConfig,
    ) -> Self {
        Self {
            engine: Arc::new(Engine::new(channel, clock, config)),
        }
    }

    /// Listener を登録する（複数登録できる）
    pub fn add_listener(&self, listener: Arc<dyn CollaborationListener>) {
        self.engine.add_listener(listener);
    }

    pub fn is_active(&self) -> bool {
        self.engine.with_session(None, |_| ()).is_some()
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.engine.with_session(None, |s| s.room_id.clone())
    }

    /// The local user of the active session
    pub fn current_user(&self) -> Option<CollaborationUser> {
        self.engine.with_session(None, |s| s.user.clone())
    }

    /// Other users seen within the staleness threshold, sorted by name
    pub fn get_active_users(&self) -> Vec<CollaborationUser> {
        let now = self.engine.now();
        let staleness_ms = self.engine.config.staleness_ms;
        self.engine
            .with_session(None, |s| s.state.active_users(now, staleness_ms))
            .unwrap_or_default()
    }

    /// A remote user is editing or has locked the field
    pub fn is_field_locked(&self, field_path: &str) -> bool {
        self.get_field_editor(field_path).is_some()
    }

    /// The active-edit or lock marker of the field
    pub fn get_field_editor(&self, field_path: &str) -> Option<FieldEdit> {
        let field_path = FieldPath::new(field_path).ok()?;
        self.engine
            .with_session(None, |s| s.state.field_editor(&field_path).cloned())
            .flatten()
    }

    /// Snapshot of the session state (empty without a session)
    pub fn get_state(&self) -> CollaborationState {
        self.engine
            .with_session(None, |s| s.state.clone())
            .unwrap_or_default()
    }
}

impl Drop for CollaborationService {
    fn drop(&mut self) {
        // leave_session を呼ばずに破棄された場合もタスクは止める
        if let Some(session) = self.engine.take_session() {
            tracing::debug!(
                "CollaborationService dropped with an active session in room '{}'",
                session.room_id
            );
        }
    }
}
