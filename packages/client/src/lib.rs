//! Tandem collaboration client.
//!
//! A client-side engine that tracks who else is editing the same record,
//! propagates field edits, flags near-simultaneous edits as conflicts and
//! coordinates advisory field locks over a room-scoped broadcast channel.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
