//! Prompt utilities for the REPL.

use std::io::Write;

pub fn prompt(user_id: &str) -> String {
    format!("{}> ", user_id)
}

/// Redisplay the prompt after printing a notification
pub fn redisplay_prompt(user_id: &str) {
    print!("{}", prompt(user_id));
    std::io::stdout().flush().ok();
}
