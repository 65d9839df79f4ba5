//! `WebSocketChannel` against an in-process Tandem room server.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use tokio::net::TcpListener;

use tandem_client::{
    domain::{
        BroadcastChannel, ChannelError, ChannelEvent, ChannelSubscription, CollaborationConfig,
        CollaborationError, ConnectionStatus, RoomId, UserId, UserIdentity,
    },
    infrastructure::channel::WebSocketChannel,
    usecase::CollaborationService,
};
use tandem_server::{
    domain::{MessagePusher, RoomRepository},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::Server,
    usecase::{
        GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase,
        PublishBroadcastUseCase, TrackPresenceUseCase,
    },
};
use tandem_shared::time::SystemClock;

/// Start a server on an ephemeral port and return its WebSocket endpoint
async fn start_server() -> String {
    let repository: Arc<dyn RoomRepository> = Arc::new(InMemoryRoomRepository::new(8));
    let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
    let server = Server::new(
        Arc::new(JoinRoomUseCase::new(repository.clone(), pusher.clone())),
        Arc::new(LeaveRoomUseCase::new(repository.clone(), pusher.clone())),
        Arc::new(TrackPresenceUseCase::new(repository.clone(), pusher.clone())),
        Arc::new(PublishBroadcastUseCase::new(
            repository.clone(),
            pusher.clone(),
            true,
        )),
        Arc::new(GetRoomsUseCase::new(repository.clone())),
        Arc::new(GetRoomDetailUseCase::new(repository)),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/ws", addr)
}

fn room() -> RoomId {
    RoomId::new("org-1").unwrap()
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

async fn next_event(events: &mut ChannelSubscription) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("subscription closed")
}

async fn next_broadcast(events: &mut ChannelSubscription) -> (String, serde_json::Value) {
    loop {
        if let ChannelEvent::Broadcast { event, payload } = next_event(events).await {
            return (event, payload);
        }
    }
}

#[tokio::test]
async fn test_subscribe_delivers_subscribed_then_snapshot() {
    // テスト項目: 接続直後に Subscribed、続いて presence のスナップショットが届く
    // given (前提条件):
    let url = start_server().await;
    let channel = WebSocketChannel::new(url);

    // when (操作):
    let mut events = channel.subscribe(&room(), &user("alice")).await.unwrap();

    // then (期待する結果):
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Status(ConnectionStatus::Subscribed)
    );
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::PresenceSync(vec![])
    );
}

#[tokio::test]
async fn test_broadcast_reaches_room_members() {
    // テスト項目: publish したイベントは送信者を含む同じ Room のメンバーに届く
    // given (前提条件):
    let url = start_server().await;
    let alice = WebSocketChannel::new(url.clone());
    let bob = WebSocketChannel::new(url);
    let mut alice_events = alice.subscribe(&room(), &user("alice")).await.unwrap();
    let mut bob_events = bob.subscribe(&room(), &user("bob")).await.unwrap();
    next_event(&mut bob_events).await;

    // when (操作):
    alice
        .publish("field_edit", json!({"fieldPath": "price", "value": 100}))
        .await
        .unwrap();

    // then (期待する結果):
    let (event, payload) = next_broadcast(&mut bob_events).await;
    assert_eq!(event, "field_edit");
    assert_eq!(payload["value"], 100);
    let (event, _) = next_broadcast(&mut alice_events).await;
    assert_eq!(event, "field_edit");
}

#[tokio::test]
async fn test_track_and_untrack_reach_others() {
    // テスト項目: track は presence_join、untrack は presence_leave として他のメンバーに届く
    // given (前提条件):
    let url = start_server().await;
    let alice = WebSocketChannel::new(url.clone());
    let bob = WebSocketChannel::new(url);
    let _alice_events = alice.subscribe(&room(), &user("alice")).await.unwrap();
    let mut bob_events = bob.subscribe(&room(), &user("bob")).await.unwrap();

    // when (操作):
    alice
        .track(json!({"id": "alice", "name": "Alice", "email": "", "color": "#FF6B6B", "lastSeen": 1}))
        .await
        .unwrap();
    let joined = loop {
        if let ChannelEvent::PresenceJoin(presence) = next_event(&mut bob_events).await {
            break presence;
        }
    };
    alice.untrack().await.unwrap();
    let left = loop {
        if let ChannelEvent::PresenceLeave(presence) = next_event(&mut bob_events).await {
            break presence;
        }
    };

    // then (期待する結果):
    assert_eq!(joined["id"], "alice");
    assert_eq!(left["id"], "alice");
}

#[tokio::test]
async fn test_duplicate_user_is_rejected() {
    // テスト項目: 同じユーザー ID での 2 つ目の接続は DuplicateUser になる
    // given (前提条件):
    let url = start_server().await;
    let first = WebSocketChannel::new(url.clone());
    let second = WebSocketChannel::new(url);
    let _events = first.subscribe(&room(), &user("alice")).await.unwrap();

    // when (操作):
    let result = second.subscribe(&room(), &user("alice")).await;

    // then (期待する結果):
    assert!(matches!(result, Err(ChannelError::DuplicateUser(id)) if id == "alice"));
}

#[tokio::test]
async fn test_send_without_subscription_fails() {
    // テスト項目: 接続前の publish は Closed エラーになる
    // given (前提条件):
    let channel = WebSocketChannel::new("ws://127.0.0.1:1/ws");

    // when (操作):
    let result = channel.publish("field_edit", json!({})).await;

    // then (期待する結果):
    assert_eq!(result, Err(ChannelError::Closed));
}

#[tokio::test]
async fn test_services_collaborate_over_websocket() {
    // テスト項目: WebSocket 経由でもリモートの編集がマーカーとして反映される
    // given (前提条件):
    let url = start_server().await;
    let config = CollaborationConfig::default().with_heartbeat_interval(None);
    let alice = CollaborationService::new(
        Arc::new(WebSocketChannel::new(url.clone())),
        Arc::new(SystemClock),
        config.clone(),
    );
    let bob = CollaborationService::new(
        Arc::new(WebSocketChannel::new(url)),
        Arc::new(SystemClock),
        config,
    );
    alice
        .join_organization_session(room(), UserIdentity::new(user("alice"), "Alice", ""))
        .await
        .unwrap();
    bob.join_organization_session(room(), UserIdentity::new(user("bob"), "Bob", ""))
        .await
        .unwrap();

    // when (操作):
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while alice.get_active_users().is_empty() || bob.get_active_users().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "presence not synced");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bob.broadcast_field_edit("price", json!(42)).await.unwrap();
    while !alice.is_field_locked("price") {
        assert!(tokio::time::Instant::now() < deadline, "edit not received");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // then (期待する結果):
    let editor = alice.get_field_editor("price").unwrap();
    assert_eq!(editor.user_name, "Bob");
    assert_eq!(editor.value, json!(42));
    assert!(!bob.is_field_locked("price"));

}

#[tokio::test]
async fn test_join_fails_when_server_is_unreachable() {
    // テスト項目: サーバーに接続できない場合、参加は ConnectionFailed で失敗する
    // given (前提条件):
    let service = CollaborationService::new(
        Arc::new(WebSocketChannel::new("ws://127.0.0.1:1/ws")),
        Arc::new(SystemClock),
        CollaborationConfig::default(),
    );

    // when (操作):
    let result = service
        .join_organization_session(room(), UserIdentity::new(user("alice"), "Alice", ""))
        .await;

    // then (期待する結果):
    assert!(matches!(
        result,
        Err(CollaborationError::Channel(ChannelError::ConnectionFailed(_)))
    ));
    assert!(!service.is_active());
}
