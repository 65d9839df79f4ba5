//! Broadcast channel interface.
//!
//! A room-scoped pub/sub transport with presence tracking. Broadcasts are
//! delivered to every member of the room, the sender included.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    error::ChannelError,
    value_object::{RoomId, UserId},
};

/// Connectivity of the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Subscribed,
    Closed,
    Error(String),
}

/// Events delivered by a subscribed channel
///
/// Presence records and broadcast payloads stay raw JSON so the engine can
/// validate and drop malformed messages itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Status(ConnectionStatus),
    /// Full snapshot of everyone currently present
    PresenceSync(Vec<Value>),
    PresenceJoin(Value),
    PresenceLeave(Value),
    Broadcast { event: String, payload: Value },
}

/// Receiver of the events of one subscription
pub type ChannelSubscription = mpsc::UnboundedReceiver<ChannelEvent>;

/// Room-scoped broadcast channel
///
/// The first event of a successful subscription is
/// `ChannelEvent::Status(ConnectionStatus::Subscribed)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    async fn subscribe(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<ChannelSubscription, ChannelError>;

    /// Publish or update the local presence record
    async fn track(&self, presence: Value) -> Result<(), ChannelError>;

    async fn untrack(&self) -> Result<(), ChannelError>;

    /// Send a typed broadcast to every member of the room
    async fn publish(&self, event: &str, payload: Value) -> Result<(), ChannelError>;

    /// Leave the room; no further events are delivered
    async fn unsubscribe(&self) -> Result<(), ChannelError>;
}
