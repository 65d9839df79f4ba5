//! Presence directory handlers.
//!
//! The directory holds everyone else in the room. The local user's own
//! presence records are skipped since they are mirrored as `current_user`.

use serde_json::Value;

use crate::{
    domain::presence::Upsert,
    infrastructure::dto::conversion::{parse_presence, parse_presence_id},
};

use super::engine::{Engine, Notification};

impl Engine {
    /// スナップショットでディレクトリを丸ごと置き換える
    pub(crate) fn handle_presence_sync(&self, epoch: u64, records: Vec<Value>) {
        let users: Vec<_> = records
            .into_iter()
            .filter_map(|record| match parse_presence(record) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Dropping malformed presence record: {}", e);
                    None
                }
            })
            .collect();

        let state = self.with_session(Some(epoch), |s| {
            let me = s.user.id.clone();
            s.state.replace_users(users.into_iter().filter(|u| u.id != me));
            s.state.clone()
        });
        if let Some(state) = state {
            tracing::debug!("Presence synced: {} other user(s)", state.users.len());
            self.notify(vec![Notification::StateChanged(state)]);
        }
    }

    pub(crate) fn handle_presence_join(&self, epoch: u64, record: Value) {
        let user = match parse_presence(record) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Dropping malformed presence join: {}", e);
                return;
            }
        };

        let notification = self
            .with_session(Some(epoch), |s| {
                if user.id == s.user.id {
                    return None;
                }
                // heartbeat による再登録は join ではなく更新として扱う
                match s.state.upsert_user(user.clone()) {
                    Upsert::Inserted => {
                        tracing::info!("'{}' joined", user.id);
                        Some(Notification::UserJoined(user))
                    }
                    Upsert::Updated => Some(Notification::UserUpdated(user)),
                }
            })
            .flatten();
        if let Some(notification) = notification {
            self.notify(vec![notification]);
        }
    }

    /// 退出したユーザーを削除し、そのユーザーのマーカーとロックも取り除く
    pub(crate) fn handle_presence_leave(&self, epoch: u64, record: &Value) {
        let user_id = match parse_presence_id(record) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::warn!("Dropping malformed presence leave: {}", e);
                return;
            }
        };

        let state = self
            .with_session(Some(epoch), |s| {
                if user_id == s.user.id {
                    return None;
                }
                s.state.remove_user(&user_id);
                Some(s.state.clone())
            })
            .flatten();
        if let Some(state) = state {
            tracing::info!("'{}' left", user_id);
            self.notify(vec![
                Notification::UserLeft(user_id),
                Notification::StateChanged(state),
            ]);
        }
    }
}
