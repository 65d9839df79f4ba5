//! Data Transfer Objects (DTOs) for the room server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs (shared with the client crate)
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
