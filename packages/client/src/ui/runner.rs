//! Client execution logic with reconnection support.

use std::time::Duration;

use crate::domain::{CollaborationConfig, CollaborationError, RoomId, UserIdentity};

use super::{
    prompt::prompt,
    repl::spawn_readline,
    session::{SessionEnd, run_client_session},
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Everything a client session needs to (re)join a room
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub room_id: RoomId,
    pub identity: UserIdentity,
    pub config: CollaborationConfig,
}

/// When the connection should be retried after a failed attempt
///
/// `failures` counts consecutive failed attempts, starting at 1.
fn should_attempt_reconnect(error: Option<&CollaborationError>, failures: u32) -> bool {
    if error.is_some_and(CollaborationError::is_fatal) {
        return false;
    }
    failures < MAX_RECONNECT_ATTEMPTS
}

/// Run the collaboration client with reconnection logic
///
/// Reconnects after a lost connection or a failed join, up to
/// `MAX_RECONNECT_ATTEMPTS` consecutive failures. A fatal error such as a
/// duplicate user is returned immediately.
pub async fn run_client(options: ClientOptions) -> Result<(), CollaborationError> {
    let mut input = spawn_readline(prompt(options.identity.id.as_str()));
    let mut failures = 0;

    loop {
        tracing::info!(
            "Attempting to join room '{}' at {} as '{}' (attempt {}/{})",
            options.room_id,
            options.url,
            options.identity.id,
            failures + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        let error = match run_client_session(&options, &mut input).await {
            Ok(SessionEnd::Quit) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Ok(SessionEnd::ConnectionLost(reason)) => {
                tracing::warn!("Connection lost: {}", reason);
                // 参加できていたので失敗回数は数え直す
                failures = 0;
                None
            }
            Err(e) => {
                tracing::warn!("Failed to join: {}", e);
                Some(e)
            }
        };
        failures += 1;

        if !should_attempt_reconnect(error.as_ref(), failures) {
            return match error {
                Some(e) => {
                    tracing::error!("Giving up: {}", e);
                    Err(e)
                }
                None => Ok(()),
            };
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            RECONNECT_INTERVAL_SECS,
            failures + 1,
            MAX_RECONNECT_ATTEMPTS
        );
        tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelError, DomainError};

    #[test]
    fn test_duplicate_user_is_not_retried() {
        // テスト項目: DuplicateUser では再接続しない
        // given (前提条件):
        let error = CollaborationError::from(ChannelError::DuplicateUser("alice".to_string()));

        // when (操作):
        let result = should_attempt_reconnect(Some(&error), 1);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_invalid_input_is_not_retried() {
        // テスト項目: 値の検証エラーでは再接続しない
        // given (前提条件):
        let error = CollaborationError::from(DomainError::InvalidUserId("".to_string()));

        // when (操作):
        let result = should_attempt_reconnect(Some(&error), 1);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_connection_failure_is_retried_until_limit() {
        // テスト項目: 接続失敗は上限回数に達するまで再接続する
        // given (前提条件):
        let error = CollaborationError::from(ChannelError::ConnectionFailed("refused".to_string()));

        // when (操作):
        let below_limit = should_attempt_reconnect(Some(&error), MAX_RECONNECT_ATTEMPTS - 1);
        let at_limit = should_attempt_reconnect(Some(&error), MAX_RECONNECT_ATTEMPTS);

        // then (期待する結果):
        assert!(below_limit);
        assert!(!at_limit);
    }

    #[test]
    fn test_lost_connection_is_retried() {
        // テスト項目: 参加後の切断は再接続の対象になる
        // given (前提条件):
        let failures = 1;

        // when (操作):
        let result = should_attempt_reconnect(None, failures);

        // then (期待する結果):
        assert!(result);
    }
}
