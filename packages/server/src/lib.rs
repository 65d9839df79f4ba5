//! Tandem room server.
//!
//! Rooms of members with presence blobs and relayed broadcasts over WebSocket.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
