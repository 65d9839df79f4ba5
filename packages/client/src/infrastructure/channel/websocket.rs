//! WebSocket を使った BroadcastChannel 実装
//!
//! ## 責務
//!
//! - Tandem room server への接続（`/ws?room_id=..&user_id=..`）
//! - サーバーのフレームを `ChannelEvent` に変換する読み取りタスク
//! - 送信キューを WebSocket に書き出す書き込みタスク

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use tandem_server::infrastructure::dto::websocket::{ClientFrame, ServerFrame};

use crate::domain::{
    BroadcastChannel, ChannelError, ChannelEvent, ChannelSubscription, ConnectionStatus, RoomId,
    UserId,
};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// WebSocket client of the Tandem room server
///
/// ## 使用例
///
/// ```ignore
/// let channel = WebSocketChannel::new("ws://127.0.0.1:8080/ws");
/// let events = channel.subscribe(&room_id, &user_id).await?;
/// ```
pub struct WebSocketChannel {
    url: String,
    connection: Mutex<Option<Connection>>,
}

impl WebSocketChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection: Mutex::new(None),
        }
    }

    fn connect_url(&self, room_id: &RoomId, user_id: &UserId) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}room_id={}&user_id={}",
            self.url, separator, room_id, user_id
        )
    }

    async fn send_frame(&self, frame: ClientFrame) -> Result<(), ChannelError> {
        let json =
            serde_json::to_string(&frame).map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        let connection = self.connection.lock().await;
        let connection = connection.as_ref().ok_or(ChannelError::Closed)?;
        connection
            .outbound
            .send(Message::Text(json.into()))
            .map_err(|_| ChannelError::Closed)
    }

    async fn close(connection: Connection) {
        connection.reader.abort();
        let _ = connection.outbound.send(Message::Close(None));
        drop(connection.outbound);
        if tokio::time::timeout(CLOSE_TIMEOUT, connection.writer)
            .await
            .is_err()
        {
            tracing::debug!("Timed out waiting for the WebSocket writer to close");
        }
    }
}

/// サーバーのフレームを ChannelEvent に変換
fn frame_to_event(frame: ServerFrame) -> ChannelEvent {
    match frame {
        ServerFrame::Subscribed { .. } => ChannelEvent::Status(ConnectionStatus::Subscribed),
        ServerFrame::PresenceSync { presences } => {
            ChannelEvent::PresenceSync(presences.into_iter().map(|p| p.presence).collect())
        }
        ServerFrame::PresenceJoin { presence, .. } => ChannelEvent::PresenceJoin(presence),
        ServerFrame::PresenceLeave { presence, .. } => ChannelEvent::PresenceLeave(presence),
        ServerFrame::Broadcast { event, payload } => ChannelEvent::Broadcast { event, payload },
        ServerFrame::Error { message } => ChannelEvent::Status(ConnectionStatus::Error(message)),
    }
}

#[async_trait]
impl BroadcastChannel for WebSocketChannel {
    async fn subscribe(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<ChannelSubscription, ChannelError> {
        let mut connection = self.connection.lock().await;
        if let Some(previous) = connection.take() {
            Self::close(previous).await;
        }

        let url = self.connect_url(room_id, user_id);
        let (ws_stream, _response) = match connect_async(&url).await {
            Ok(result) => result,
            Err(tokio_tungstenite::tungstenite::Error::Http(response))
                if response.status().as_u16() == 409 =>
            {
                return Err(ChannelError::DuplicateUser(user_id.to_string()));
            }
            Err(e) => return Err(ChannelError::ConnectionFailed(e.to_string())),
        };
        tracing::info!("Connected to {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        // Spawn a task to handle incoming frames
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let event = match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => frame_to_event(frame),
                        Err(e) => {
                            tracing::warn!("Dropping unparsable server frame: {}", e);
                            continue;
                        }
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        let _ = event_tx
                            .send(ChannelEvent::Status(ConnectionStatus::Error(e.to_string())));
                        return;
                    }
                    _ => continue,
                };
                if event_tx.send(event).is_err() {
                    return;
                }
            }
            let _ = event_tx.send(ChannelEvent::Status(ConnectionStatus::Closed));
        });

        // Spawn a task to drain the outbound queue
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let is_close = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    tracing::warn!("Failed to send frame: {}", e);
                    break;
                }
                if is_close {
                    break;
                }
            }
            let _ = write.close().await;
        });

        *connection = Some(Connection {
            outbound,
            reader,
            writer,
        });
        Ok(event_rx)
    }

    async fn track(&self, presence: Value) -> Result<(), ChannelError> {
        self.send_frame(ClientFrame::Track { presence }).await
    }

    async fn untrack(&self) -> Result<(), ChannelError> {
        self.send_frame(ClientFrame::Untrack).await
    }

    async fn publish(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        self.send_frame(ClientFrame::Broadcast {
            event: event.to_string(),
            payload,
        })
        .await
    }

    async fn unsubscribe(&self) -> Result<(), ChannelError> {
        if let Some(connection) = self.connection.lock().await.take() {
            Self::close(connection).await;
            tracing::info!("Disconnected from {}", self.url);
        }
        Ok(())
    }
}
