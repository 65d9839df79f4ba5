//! Infrastructure layer: broadcast channel implementations and the payload
//! DTOs exchanged between collaborating clients.

pub mod channel;
pub mod dto;
