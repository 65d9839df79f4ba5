//! UseCase layer: the collaboration service.
//!
//! `CollaborationService` owns one session at a time. Its parts live in
//! separate modules that all extend the same engine:
//!
//! - `session`: join / leave, the per-session event loop, presence heartbeat
//! - `presence`: presence directory handlers
//! - `propagator`: field edits and cursor moves
//! - `lock`: soft field locks

mod engine;
mod lock;
mod presence;
mod propagator;
mod service;
mod session;

pub use service::CollaborationService;

#[cfg(test)]
pub(crate) mod test_support;
