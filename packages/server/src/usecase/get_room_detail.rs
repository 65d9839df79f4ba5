//! UseCase: Room 詳細取得

use std::sync::Arc;

use crate::domain::{Room, RoomId, RoomRepository};

use super::error::GetRoomDetailError;

/// Room 詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: String) -> Result<Room, GetRoomDetailError> {
        let room_id = RoomId::new(room_id).map_err(|_| GetRoomDetailError::InvalidRoomId)?;
        self.repository
            .get_room(&room_id)
            .await
            .map_err(|_| GetRoomDetailError::RoomNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Timestamp,
        usecase::test_support::{create_test_repository, room, user},
    };

    #[tokio::test]
    async fn test_get_room_detail_found() {
        // テスト項目: 存在する Room の詳細が取得できる
        // given (前提条件):
        let repository = create_test_repository(8);
        repository
            .add_member(&room("org-1"), user("alice"), Timestamp::new(1))
            .await
            .unwrap();
        let usecase = GetRoomDetailUseCase::new(repository);

        // when (操作):
        let result = usecase.execute("org-1".to_string()).await;

        // then (期待する結果):
        let detail = result.unwrap();
        assert_eq!(detail.id, room("org-1"));
        assert_eq!(detail.members.len(), 1);
    }

    #[tokio::test]
    async fn test_get_room_detail_not_found() {
        // テスト項目: 存在しない Room は RoomNotFound になる
        // given (前提条件):
        let usecase = GetRoomDetailUseCase::new(create_test_repository(8));

        // when (操作):
        let result = usecase.execute("org-404".to_string()).await;

        // then (期待する結果):
        assert_eq!(result, Err(GetRoomDetailError::RoomNotFound));
    }

    #[tokio::test]
    async fn test_get_room_detail_invalid_id() {
        // テスト項目: 不正な形式の Room ID は InvalidRoomId になる
        // given (前提条件):
        let usecase = GetRoomDetailUseCase::new(create_test_repository(8));

        // when (操作):
        let result = usecase.execute("org 1".to_string()).await;

        // then (期待する結果):
        assert_eq!(result, Err(GetRoomDetailError::InvalidRoomId));
    }
}
