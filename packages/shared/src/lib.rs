//! Utilities shared by the Tandem server and client.

pub mod logger;
pub mod time;
