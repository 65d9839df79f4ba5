//! Domain layer of the collaboration engine.
//!
//! Pure data and algorithms (presence directory, active-edit markers,
//! conflict detection) plus the interfaces the usecase layer depends on
//! (`BroadcastChannel`, `CollaborationListener`).

pub mod active_edit;
pub mod channel;
pub mod config;
pub mod conflict;
pub mod error;
pub mod field_edit;
pub mod listener;
pub mod presence;
pub mod state;
pub mod user;
pub mod value_object;

pub use channel::{BroadcastChannel, ChannelEvent, ChannelSubscription, ConnectionStatus};
pub use config::CollaborationConfig;
pub use conflict::ConflictDetector;
pub use error::{ChannelError, CollaborationError, DomainError};
pub use field_edit::FieldEdit;
pub use listener::CollaborationListener;
pub use state::CollaborationState;
pub use user::{CollaborationUser, Cursor, USER_COLORS, UserIdentity};
pub use value_object::{ChangeId, FieldPath, RoomId, UserId};
