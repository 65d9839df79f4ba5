//! Interactive Tandem collaboration client.
//!
//! Joins a room on a Tandem server and reads commands from stdin: field
//! edits, cursor moves and soft locks are broadcast to the room, and remote
//! activity is printed as it arrives. Reconnects automatically (max 5
//! attempts with 5 second interval). Duplicate user ids are rejected by the
//! server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tandem-client -- --room org-1 --user-id alice --name Alice
//! cargo run --bin tandem-client -- -r org-1 -c bob --name Bob --email bob@example.com
//! ```

use std::time::Duration;

use clap::Parser;

use tandem_client::{
    domain::{CollaborationConfig, RoomId, UserId, UserIdentity},
    ui::{ClientOptions, run_client},
};
use tandem_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tandem-client")]
#[command(about = "Real-time field collaboration client", long_about = None)]
struct Args {
    /// WebSocket endpoint of the Tandem server
    #[arg(short = 'u', long, env = "TANDEM_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Room (organization) to join
    #[arg(short = 'r', long, env = "TANDEM_ROOM")]
    room: String,

    /// User ID (must be unique within the room)
    #[arg(short = 'c', long, env = "TANDEM_USER_ID")]
    user_id: String,

    /// Display name (defaults to the user ID)
    #[arg(long, env = "TANDEM_USER_NAME")]
    name: Option<String>,

    #[arg(long, env = "TANDEM_USER_EMAIL", default_value = "")]
    email: String,

    #[arg(long, env = "TANDEM_AVATAR_URL")]
    avatar_url: Option<String>,

    /// Presence re-track interval in seconds (0 disables it)
    #[arg(long, env = "TANDEM_HEARTBEAT_SECS", default_value_t = 15)]
    heartbeat_secs: u64,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "TANDEM_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let (room_id, user_id) = match (RoomId::new(&args.room), UserId::new(&args.user_id)) {
        (Ok(room_id), Ok(user_id)) => (room_id, user_id),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let name = args.name.unwrap_or_else(|| user_id.to_string());
    let mut identity = UserIdentity::new(user_id, name, args.email);
    if let Some(avatar_url) = args.avatar_url {
        identity = identity.with_avatar_url(avatar_url);
    }

    let heartbeat = (args.heartbeat_secs > 0).then(|| Duration::from_secs(args.heartbeat_secs));
    let options = ClientOptions {
        url: args.url,
        room_id,
        identity,
        config: CollaborationConfig::default().with_heartbeat_interval(heartbeat),
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
