//! Line input and command execution.

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::usecase::CollaborationService;

use super::{command::Command, formatter::MessageFormatter};

/// rustyline は同期 API なので専用スレッドで読み、行をチャンネルに流す
///
/// Ctrl+C / Ctrl+D でチャンネルが閉じる。
pub fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    if input_tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });
    input_rx
}

/// Quit 以外のコマンドを実行し、表示する文字列を返す
pub async fn execute(service: &CollaborationService, command: Command) -> String {
    match command {
        Command::Edit { field, value } => match service.broadcast_field_edit(&field, value).await {
            Some(edit) => MessageFormatter::format_edit_sent(&edit),
            None => format!("Could not edit '{}'\n", field),
        },
        Command::Cursor { x, y, field } => {
            service.broadcast_cursor_move(x, y, field.as_deref()).await;
            String::new()
        }
        Command::Lock(field) => {
            let held = service
                .get_field_editor(&field)
                .map(|editor| format!("{} is held by {}\n", field, editor.user_name))
                .unwrap_or_default();
            service.lock_field(&field).await;
            format!("{}Locked {}\n", held, field)
        }
        Command::Unlock(field) => {
            service.unlock_field(&field).await;
            format!("Unlocked {}\n", field)
        }
        Command::Who => {
            let me = service.current_user();
            MessageFormatter::format_users(&service.get_active_users(), me.as_ref())
        }
        Command::Fields => {
            let mut markers: Vec<_> = service.get_state().active_edits.into_values().collect();
            markers.sort_by(|a, b| a.field_path.cmp(&b.field_path));
            MessageFormatter::format_fields(&markers)
        }
        Command::Help => MessageFormatter::format_help(),
        Command::Quit => String::new(),
    }
}
