//! UseCase layer of the room server.

pub mod error;
pub mod get_room_detail;
pub mod get_rooms;
pub mod join_room;
pub mod leave_room;
pub mod publish_broadcast;
pub mod track_presence;

pub use error::{GetRoomDetailError, JoinError, LeaveError, PresenceError, PublishError};
pub use get_room_detail::GetRoomDetailUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use join_room::JoinRoomUseCase;
pub use leave_room::{LeaveOutcome, LeaveRoomUseCase};
pub use publish_broadcast::PublishBroadcastUseCase;
pub use track_presence::{TrackPresenceUseCase, Untracked};
