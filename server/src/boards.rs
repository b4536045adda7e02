use std::sync::Arc;

use doodleboard_shared::BoardDocument;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::logic::sanitize_document;
use crate::state::{AppState, Board};
use crate::storage::StorageError;

pub fn new_board_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn normalize_board_id(value: &str) -> Option<String> {
    let parsed = Uuid::parse_str(value).ok()?;
    Some(parsed.to_string())
}

pub async fn get_or_create_board(state: &AppState, board_id: &str) -> Arc<RwLock<Board>> {
    if let Some(board) = state.boards.read().await.get(board_id).cloned() {
        return board;
    }
    // Loading under the map lock keeps a reload from racing an eviction.
    let mut boards = state.boards.write().await;
    if let Some(board) = boards.get(board_id).cloned() {
        return board;
    }
    let document = match state.storage.load_board(board_id).await {
        Ok(document) => {
            info!(board_id, strokes = document.strokes.len(), "loaded board");
            sanitize_document(document)
        }
        Err(StorageError::NotFound(_)) => {
            info!(board_id, "creating board");
            BoardDocument::default()
        }
        Err(error) => {
            warn!(board_id, %error, "failed to load board, starting empty");
            BoardDocument::default()
        }
    };
    let board = Arc::new(RwLock::new(Board::new(document)));
    boards.insert(board_id.to_string(), board.clone());
    board
}

/// Takes a snapshot of the board if it has unsaved strokes and clears the flag.
pub async fn take_dirty_document(board: &RwLock<Board>) -> Option<BoardDocument> {
    let mut board = board.write().await;
    if !board.dirty {
        return None;
    }
    board.dirty = false;
    Some(board.document.clone())
}

pub async fn save_board(state: &AppState, board_id: &str, board: &RwLock<Board>) {
    let save_lock = board.read().await.save_lock.clone();
    let _saving = save_lock.lock().await;
    let Some(document) = take_dirty_document(board).await else {
        return;
    };
    match state.storage.save_board(board_id, &document).await {
        Ok(()) => info!(board_id, strokes = document.strokes.len(), "saved board"),
        Err(error) => {
            warn!(board_id, %error, "failed to save board");
            board.write().await.dirty = true;
        }
    }
}

/// Flushes every dirty board, then drops the ones nobody is using.
pub async fn save_dirty_boards(state: &AppState) {
    let boards = {
        let boards = state.boards.read().await;
        boards
            .iter()
            .map(|(board_id, board)| (board_id.clone(), board.clone()))
            .collect::<Vec<_>>()
    };
    for (board_id, board) in boards {
        save_board(state, &board_id, &board).await;
        drop(board);
        evict_idle_board(state, board_id.as_str()).await;
    }
}

/// Removes the board from memory if it has no peers, no unsaved strokes and
/// no other holder. Handles are only cloned out of the map under its lock, so
/// a strong count of one means nothing can still write to it.
pub async fn evict_idle_board(state: &AppState, board_id: &str) {
    let mut boards = state.boards.write().await;
    let idle = match boards.get(board_id) {
        Some(board) if Arc::strong_count(board) == 1 => match board.try_read() {
            Ok(board) => board.peers.is_empty() && !board.dirty,
            Err(_) => false,
        },
        _ => false,
    };
    if idle {
        boards.remove(board_id);
        info!(board_id, "evicted board");
    }
}

/// Saves the board once its last peer has left and evicts it when idle. A
/// board whose save failed stays in memory for the next flush.
pub async fn release_board(state: &AppState, board_id: &str, board: Arc<RwLock<Board>>) {
    if !board.read().await.peers.is_empty() {
        return;
    }
    save_board(state, board_id, &board).await;
    drop(board);
    evict_idle_board(state, board_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use doodleboard_shared::{Shape, StoredStroke};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        saved: Mutex<Vec<(String, BoardDocument)>>,
    }

    #[async_trait]
    impl crate::storage::Storage for MemoryStorage {
        async fn load_board(&self, board_id: &str) -> Result<BoardDocument, StorageError> {
            let saved = self.saved.lock().await;
            saved
                .iter()
                .rev()
                .find(|(id, _)| id == board_id)
                .map(|(_, document)| document.clone())
                .ok_or_else(|| StorageError::NotFound(board_id.to_string()))
        }

        async fn save_board(
            &self,
            board_id: &str,
            data: &BoardDocument,
        ) -> Result<(), StorageError> {
            self.saved
                .lock()
                .await
                .push((board_id.to_string(), data.clone()));
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".into()
        }
    }

    fn stroke() -> StoredStroke {
        StoredStroke {
            id: "s".into(),
            shape: Shape::Freehand,
            color: "#111111".into(),
            size: 3.0,
            num_buckets: 1,
            gap: 1,
            samples: vec![0.0, 0.0, 1.0, 1.0],
        }
    }

    #[test]
    fn board_ids_are_normalized_uuids() {
        let id = new_board_id();
        assert_eq!(normalize_board_id(&id.to_uppercase()), Some(id));
        assert_eq!(normalize_board_id("not-a-board"), None);
    }

    #[tokio::test]
    async fn boards_are_shared_and_saved_only_when_dirty() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::new(storage.clone(), Duration::from_secs(60));
        let board_id = new_board_id();

        let first = get_or_create_board(&state, &board_id).await;
        let second = get_or_create_board(&state, &board_id).await;
        assert!(Arc::ptr_eq(&first, &second));

        save_dirty_boards(&state).await;
        assert!(storage.saved.lock().await.is_empty());

        {
            let mut board = first.write().await;
            board.document.strokes.push(stroke());
            board.dirty = true;
        }
        save_dirty_boards(&state).await;
        save_dirty_boards(&state).await;
        let saved = storage.saved.lock().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].1.strokes.len(), 1);
    }

    #[tokio::test]
    async fn released_boards_are_evicted_and_reloaded() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::new(storage.clone(), Duration::from_secs(60));
        let board_id = new_board_id();

        let board = get_or_create_board(&state, &board_id).await;
        {
            let mut board = board.write().await;
            board.document.strokes.push(stroke());
            board.dirty = true;
        }
        let weak = Arc::downgrade(&board);
        release_board(&state, &board_id, board).await;
        assert!(state.boards.read().await.is_empty());
        assert!(weak.upgrade().is_none());

        let reloaded = get_or_create_board(&state, &board_id).await;
        assert_eq!(reloaded.read().await.document.strokes.len(), 1);
    }

    struct FailingStorage;

    #[async_trait]
    impl crate::storage::Storage for FailingStorage {
        async fn load_board(&self, board_id: &str) -> Result<BoardDocument, StorageError> {
            Err(StorageError::NotFound(board_id.to_string()))
        }

        async fn save_board(
            &self,
            board_id: &str,
            _: &BoardDocument,
        ) -> Result<(), StorageError> {
            Err(StorageError::Remote {
                board_id: board_id.to_string(),
                message: "bucket unavailable".into(),
            })
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    #[tokio::test]
    async fn boards_with_failed_saves_stay_for_the_next_flush() {
        let state = AppState::new(Arc::new(FailingStorage), Duration::from_secs(60));
        let board_id = new_board_id();

        let board = get_or_create_board(&state, &board_id).await;
        {
            let mut board = board.write().await;
            board.document.strokes.push(stroke());
            board.dirty = true;
        }
        release_board(&state, &board_id, board).await;

        let kept = state.boards.read().await.get(&board_id).cloned().unwrap();
        let kept = kept.read().await;
        assert!(kept.dirty);
        assert_eq!(kept.document.strokes.len(), 1);
    }

    #[tokio::test]
    async fn boards_held_elsewhere_are_not_evicted() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::new(storage.clone(), Duration::from_secs(60));
        let board_id = new_board_id();

        let first = get_or_create_board(&state, &board_id).await;
        let second = get_or_create_board(&state, &board_id).await;
        release_board(&state, &board_id, first).await;
        assert!(state.boards.read().await.contains_key(&board_id));

        {
            let mut board = second.write().await;
            board.document.strokes.push(stroke());
            board.dirty = true;
        }
        release_board(&state, &board_id, second).await;
        assert!(state.boards.read().await.is_empty());
        let saved = storage.saved.lock().await;
        assert_eq!(saved.last().unwrap().1.strokes.len(), 1);
    }

    #[tokio::test]
    async fn flush_evicts_idle_boards_after_saving() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::new(storage.clone(), Duration::from_secs(60));
        let board_id = new_board_id();

        {
            let board = get_or_create_board(&state, &board_id).await;
            let mut board = board.write().await;
            board.document.strokes.push(stroke());
            board.dirty = true;
        }
        save_dirty_boards(&state).await;
        assert!(state.boards.read().await.is_empty());
        assert_eq!(storage.saved.lock().await.len(), 1);
    }
}
