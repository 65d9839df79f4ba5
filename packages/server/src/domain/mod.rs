//! Domain layer of the room server.
//!
//! Room membership, presence blobs and the interfaces (Repository,
//! MessagePusher) the usecase layer depends on.

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Member, PresenceEntry, Room};
pub use error::{MessagePushError, RepositoryError, RoomError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::RoomRepository;
pub use value_object::{RoomId, Timestamp, UserId};
