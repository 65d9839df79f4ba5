//! Listener that prints collaboration events to the terminal.

use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

use tokio::sync::mpsc;

use crate::domain::{
    CollaborationListener, CollaborationState, CollaborationUser, ConnectionStatus, FieldEdit,
    FieldPath, UserId,
};

use super::{formatter::MessageFormatter, prompt::redisplay_prompt};

/// Prints notifications and forwards lost-connection statuses to the runner
pub struct PrintingListener {
    user_id: String,
    status_tx: mpsc::UnboundedSender<ConnectionStatus>,
    /// 前回表示したロックの状態（変化したときだけ表示する）
    locks: Mutex<BTreeMap<FieldPath, String>>,
}

impl PrintingListener {
    pub fn new(user_id: &UserId, status_tx: mpsc::UnboundedSender<ConnectionStatus>) -> Self {
        Self {
            user_id: user_id.to_string(),
            status_tx,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    fn print(&self, text: &str) {
        print!("{}", text);
        redisplay_prompt(&self.user_id);
    }

    /// 前回からのロックの増減を求めて、表示用の文字列にする
    fn lock_changes(&self, state: &CollaborationState) -> Vec<String> {
        let current: BTreeMap<FieldPath, String> = state
            .active_edits
            .values()
            .filter(|m| m.is_lock_marker())
            .map(|m| (m.field_path.clone(), m.user_name.clone()))
            .collect();
        let mut previous = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        let mut changes = Vec::new();
        for (path, user_name) in &current {
            if previous.get(path) != Some(user_name) {
                changes.push(MessageFormatter::format_lock_changed(
                    path.as_str(),
                    user_name,
                    true,
                ));
            }
        }
        for (path, user_name) in previous.iter() {
            if !current.contains_key(path) {
                changes.push(MessageFormatter::format_lock_changed(
                    path.as_str(),
                    user_name,
                    false,
                ));
            }
        }
        *previous = current;
        changes
    }
}

impl CollaborationListener for PrintingListener {
    fn on_user_joined(&self, user: &CollaborationUser) {
        self.print(&MessageFormatter::format_user_joined(user));
    }

    fn on_user_left(&self, user_id: &UserId) {
        self.print(&MessageFormatter::format_user_left(user_id.as_str()));
    }

    fn on_field_edit(&self, edit: &FieldEdit) {
        self.print(&MessageFormatter::format_field_edit(edit));
    }

    fn on_conflict_detected(&self, conflicts: &[FieldEdit]) {
        self.print(&MessageFormatter::format_conflict(conflicts));
    }

    fn on_state_changed(&self, state: &CollaborationState) {
        for change in self.lock_changes(state) {
            self.print(&change);
        }
    }

    fn on_connection_status(&self, status: &ConnectionStatus) {
        self.print(&MessageFormatter::format_connection_status(status));
        if !matches!(status, ConnectionStatus::Subscribed) {
            // runner が閉じていれば通知先はない
            let _ = self.status_tx.send(status.clone());
        }
    }
}
