//! UI layer: the interactive CLI client.
//!
//! - `runner`: reconnect loop
//! - `session`: one joined session driving the REPL
//! - `command` / `repl`: input parsing and execution
//! - `listener` / `formatter`: terminal output

mod command;
mod formatter;
mod listener;
mod prompt;
mod repl;
mod runner;
mod session;

pub use command::{Command, CommandError};
pub use formatter::MessageFormatter;
pub use listener::PrintingListener;
pub use runner::{ClientOptions, run_client};
