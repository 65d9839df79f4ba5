//! One connected REPL session.

use std::sync::Arc;

use tandem_shared::time::SystemClock;
use tokio::sync::mpsc;

use crate::{
    domain::{CollaborationError, ConnectionStatus},
    infrastructure::channel::WebSocketChannel,
    usecase::CollaborationService,
};

use super::{
    command::Command, formatter::MessageFormatter, listener::PrintingListener,
    prompt::redisplay_prompt, repl::execute, runner::ClientOptions,
};

/// How a session that joined successfully ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user quit; do not reconnect
    Quit,
    ConnectionLost(String),
}

/// Join the room and run the REPL until the user quits or the connection is lost
pub async fn run_client_session(
    options: &ClientOptions,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<SessionEnd, CollaborationError> {
    let user_id = options.identity.id.to_string();
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();

    let service = CollaborationService::new(
        Arc::new(WebSocketChannel::new(options.url.clone())),
        Arc::new(SystemClock),
        options.config.clone(),
    );
    service.add_listener(Arc::new(PrintingListener::new(
        &options.identity.id,
        status_tx,
    )));

    let me = service
        .join_organization_session(options.room_id.clone(), options.identity.clone())
        .await?;
    print!(
        "{}",
        MessageFormatter::format_session_joined(&me, &options.room_id)
    );
    redisplay_prompt(&user_id);

    let end = loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else {
                    break SessionEnd::Quit;
                };
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break SessionEnd::Quit,
                    Ok(command) => print!("{}", execute(&service, command).await),
                    Err(e) => println!("{}", e),
                }
                redisplay_prompt(&user_id);
            }
            status = status_rx.recv() => {
                let reason = match status {
                    Some(ConnectionStatus::Error(message)) => message,
                    _ => "connection closed".to_string(),
                };
                break SessionEnd::ConnectionLost(reason);
            }
        }
    };

    service.leave_session().await;
    Ok(end)
}
