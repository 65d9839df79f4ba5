//! WebSocket connection handlers.
//!
//! One connection is one member of one room. Presence changes are fanned out
//! as `presence_join` / `presence_leave` followed by a full `presence_sync`,
//! and `broadcast` frames are relayed unchanged to the room.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{PusherChannel, RoomId, UserId},
    infrastructure::dto::{
        conversion::presence_sync_frame,
        websocket::{ClientFrame, ServerFrame},
    },
    ui::state::AppState,
    usecase::JoinError,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub room_id: String,
    pub user_id: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> RoomId / UserId (Domain Model)
    let room_id = match RoomId::try_from(query.room_id.clone()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid room_id '{}': {}", query.room_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let user_id = match UserId::try_from(query.user_id.clone()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid user_id '{}': {}", query.user_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    match join_member(&state, &room_id, &user_id).await {
        Ok((rx, reply_tx)) => {
            tracing::info!(
                "User '{}' joined room '{}'",
                user_id.as_str(),
                room_id.as_str()
            );
            let cleanup_state = state.clone();
            let cleanup_room = room_id.clone();
            let cleanup_user = user_id.clone();
            Ok(ws
                .on_failed_upgrade(move |e| {
                    tracing::warn!(
                        "WebSocket upgrade failed for '{}': {}",
                        cleanup_user.as_str(),
                        e
                    );
                    tokio::spawn(async move {
                        leave_and_notify(&cleanup_state, &cleanup_room, &cleanup_user).await;
                    });
                })
                .on_upgrade(move |socket| {
                    handle_socket(socket, state, room_id, user_id, rx, reply_tx)
                }))
        }
        Err(JoinError::DuplicateUser(_)) => {
            tracing::warn!(
                "User '{}' is already connected to room '{}'. Rejecting connection.",
                user_id.as_str(),
                room_id.as_str()
            );
            Err(StatusCode::CONFLICT)
        }
        Err(JoinError::RoomCapacityExceeded) => {
            tracing::warn!(
                "Room '{}' capacity exceeded. Cannot add '{}'",
                room_id.as_str(),
                user_id.as_str()
            );
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Room に参加し、本人宛てのキューを返す
///
/// `subscribed` と presence スナップショットは登録前にキューへ積むので、
/// 他のメンバーのブロードキャストより先に届く。
async fn join_member(
    state: &AppState,
    room_id: &RoomId,
    user_id: &UserId,
) -> Result<(mpsc::UnboundedReceiver<String>, PusherChannel), JoinError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscribed = ServerFrame::Subscribed {
        room_id: room_id.as_str().to_string(),
        user_id: user_id.as_str().to_string(),
    };
    let snapshot = state.join_room_usecase.presence_snapshot(room_id).await;
    // rx を保持しているので送信は失敗しない
    let _ = tx.send(subscribed.to_json());
    let _ = tx.send(presence_sync_frame(snapshot.clone()).to_json());

    state
        .join_room_usecase
        .execute(room_id, user_id.clone(), tx.clone())
        .await?;

    // 登録までの間に presence が変わっていたら送り直す
    let current = state.join_room_usecase.presence_snapshot(room_id).await;
    if current != snapshot {
        let _ = tx.send(presence_sync_frame(current).to_json());
    }
    Ok((rx, tx))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// # Arguments
///
/// * `rx` - Channel receiver for messages addressed to this client
/// * `sender` - WebSocket sink to send messages to this client
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    room_id: RoomId,
    user_id: UserId,
    rx: mpsc::UnboundedReceiver<String>,
    reply_tx: PusherChannel,
) {
    let (sender, mut receiver) = socket.split();

    let mut send_task = pusher_loop(rx, sender);

    let recv_state = state.clone();
    let recv_room = room_id.clone();
    let recv_user = user_id.clone();

    // Spawn a task to receive frames from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received text from '{}': {}", recv_user.as_str(), text);
                    match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => {
                            handle_frame(&recv_state, &recv_room, &recv_user, &reply_tx, frame)
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse frame as JSON: {}", e);
                            reply_error(&reply_tx, format!("invalid frame: {}", e));
                        }
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("User '{}' requested close", recv_user.as_str());
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    leave_and_notify(&state, &room_id, &user_id).await;
}

async fn handle_frame(
    state: &AppState,
    room_id: &RoomId,
    user_id: &UserId,
    reply_tx: &PusherChannel,
    frame: ClientFrame,
) {
    match frame {
        ClientFrame::Track { presence } => {
            match state
                .track_presence_usecase
                .track(room_id, user_id, presence.clone())
                .await
            {
                Ok(snapshot) => {
                    let joined = ServerFrame::PresenceJoin {
                        key: user_id.as_str().to_string(),
                        presence,
                    };
                    notify_presence(state, room_id, joined, presence_sync_frame(snapshot)).await;
                }
                Err(e) => {
                    tracing::warn!("Failed to track presence: {}", e);
                    reply_error(reply_tx, e.to_string());
                }
            }
        }
        ClientFrame::Untrack => match state.track_presence_usecase.untrack(room_id, user_id).await
        {
            Ok(untracked) => {
                if let Some(previous) = untracked.previous {
                    let left = ServerFrame::PresenceLeave {
                        key: user_id.as_str().to_string(),
                        presence: previous,
                    };
                    notify_presence(state, room_id, left, presence_sync_frame(untracked.snapshot))
                        .await;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to untrack presence: {}", e);
                reply_error(reply_tx, e.to_string());
            }
        },
        ClientFrame::Broadcast { event, payload } => {
            if event.trim().is_empty() {
                reply_error(reply_tx, "broadcast event must not be empty".to_string());
                return;
            }
            let relayed = ServerFrame::Broadcast { event, payload };
            if let Err(e) = state
                .publish_broadcast_usecase
                .execute(room_id, user_id, &relayed.to_json())
                .await
            {
                tracing::warn!("Failed to publish broadcast: {}", e);
                reply_error(reply_tx, e.to_string());
            }
        }
    }
}

/// presence の差分とスナップショットを Room 全員に送る
async fn notify_presence(state: &AppState, room_id: &RoomId, diff: ServerFrame, sync: ServerFrame) {
    for frame in [diff, sync] {
        if let Err(e) = state
            .track_presence_usecase
            .broadcast_to_room(room_id, &frame.to_json())
            .await
        {
            tracing::warn!("Failed to broadcast presence frame: {}", e);
        }
    }
}

/// 退出処理と、残りのメンバーへの presence_leave / presence_sync 通知
async fn leave_and_notify(state: &AppState, room_id: &RoomId, user_id: &UserId) {
    let outcome = match state.leave_room_usecase.execute(room_id, user_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("Failed to leave room '{}': {}", room_id.as_str(), e);
            return;
        }
    };
    tracing::info!(
        "User '{}' left room '{}'",
        user_id.as_str(),
        room_id.as_str()
    );

    let Some(presence) = outcome.presence else {
        return;
    };
    if outcome.notify_targets.is_empty() {
        return;
    }
    let left = ServerFrame::PresenceLeave {
        key: user_id.as_str().to_string(),
        presence,
    };
    let sync = presence_sync_frame(outcome.snapshot);
    for frame in [left, sync] {
        if let Err(e) = state
            .leave_room_usecase
            .broadcast_to_remaining(room_id, outcome.notify_targets.clone(), &frame.to_json())
            .await
        {
            tracing::warn!("Failed to broadcast presence_leave: {}", e);
        }
    }
}

fn reply_error(reply_tx: &PusherChannel, message: String) {
    let frame = ServerFrame::Error { message };
    if reply_tx.send(frame.to_json()).is_err() {
        tracing::debug!("Client queue closed before error frame was sent");
    }
}
