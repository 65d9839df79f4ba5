//! Tandem room server.
//!
//! Hosts rooms of members, keeps each member's presence blob and relays
//! typed broadcasts to everyone in the room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tandem-server
//! cargo run --bin tandem-server -- --host 0.0.0.0 --port 3000 --room-capacity 16
//! ```

use std::sync::Arc;

use clap::Parser;

use tandem_server::{
    domain::{MessagePusher, RoomRepository, entity::DEFAULT_MEMBER_CAPACITY},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::Server,
    usecase::{
        GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase,
        PublishBroadcastUseCase, TrackPresenceUseCase,
    },
};
use tandem_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tandem-server")]
#[command(about = "Room server for real-time field collaboration", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TANDEM_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TANDEM_PORT", default_value = "8080")]
    port: u16,

    /// Maximum number of members per room
    #[arg(long, env = "TANDEM_ROOM_CAPACITY", default_value_t = DEFAULT_MEMBER_CAPACITY)]
    room_capacity: usize,

    /// Do not echo broadcasts back to their sender
    #[arg(long, env = "TANDEM_NO_ECHO")]
    no_echo: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "TANDEM_LOG_LEVEL", default_value = "debug")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // 依存の組み立て
    let repository: Arc<dyn RoomRepository> =
        Arc::new(InMemoryRoomRepository::new(args.room_capacity));
    let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

    let join_room_usecase = Arc::new(JoinRoomUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let track_presence_usecase = Arc::new(TrackPresenceUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let publish_broadcast_usecase = Arc::new(PublishBroadcastUseCase::new(
        repository.clone(),
        message_pusher.clone(),
        !args.no_echo,
    ));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(repository.clone()));
    let get_room_detail_usecase = Arc::new(GetRoomDetailUseCase::new(repository));

    tracing::info!(
        "Room capacity: {}, echo to sender: {}",
        args.room_capacity,
        !args.no_echo
    );

    let server = Server::new(
        join_room_usecase,
        leave_room_usecase,
        track_presence_usecase,
        publish_broadcast_usecase,
        get_rooms_usecase,
        get_room_detail_usecase,
    );

    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
