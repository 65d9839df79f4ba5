//! Server state shared by the handlers.

use std::sync::Arc;

use crate::usecase::{
    GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase,
    PublishBroadcastUseCase, TrackPresenceUseCase,
};

/// Shared application state
pub struct AppState {
    /// JoinRoomUseCase（Room 参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// LeaveRoomUseCase（Room 退出のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// TrackPresenceUseCase（presence 登録・削除のユースケース）
    pub track_presence_usecase: Arc<TrackPresenceUseCase>,
    /// PublishBroadcastUseCase（ブロードキャストのユースケース）
    pub publish_broadcast_usecase: Arc<PublishBroadcastUseCase>,
    /// GetRoomsUseCase（Room 一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（Room 詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
}
