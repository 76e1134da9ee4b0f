//! In-memory store.

use super::{BoardStore, BoxFuture, StorageError, StorageResult};
use crate::board::GameBoard;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory store for testing and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    boards: RwLock<BTreeMap<String, GameBoard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl BoardStore for MemoryStore {
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.keys().cloned().collect())
        })
    }

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<GameBoard>> {
        let name = name.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            boards
                .get(&name)
                .cloned()
                .ok_or(StorageError::NotFound(name))
        })
    }

    fn save(&self, board: &GameBoard) -> BoxFuture<'_, StorageResult<()>> {
        let board = board.clone();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.insert(board.name().to_string(), board);
            Ok(())
        })
    }

    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.remove(&name);
            Ok(())
        })
    }

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let name = name.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.contains_key(&name))
        })
    }
}
