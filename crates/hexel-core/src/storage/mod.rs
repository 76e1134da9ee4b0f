//! Persistence of boards, keyed by board name.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod indexeddb;

pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use indexeddb::IndexedDbStore;

use crate::board::GameBoard;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tracing::info;

/// Schema version written by [`migrate`]
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the board seeded into an empty store
pub const DEFAULT_BOARD_NAME: &str = "Default";

/// The single type of the seeded board
pub const DEFAULT_TYPE_NAME: &str = "Default";
pub const DEFAULT_TYPE_COLOR: &str = "#FFFFFF";

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A collection of boards addressed by name.
///
/// `save` is an upsert keyed by [`GameBoard::name`].
///
/// On native platforms implementations must be Send + Sync. On WASM these
/// bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait BoardStore: Send + Sync {
    /// Names of all stored boards, sorted
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<GameBoard>>;

    fn save(&self, board: &GameBoard) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a board. Deleting a missing board is not an error.
    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>>;

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// A collection of boards addressed by name (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait BoardStore {
    /// Names of all stored boards, sorted
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<GameBoard>>;

    fn save(&self, board: &GameBoard) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a board. Deleting a missing board is not an error.
    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>>;

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Bring a store up to [`SCHEMA_VERSION`].
///
/// Version 1 seeds an empty store with a board named `Default` holding one
/// white `Default` type. Returns whether anything was written.
pub async fn migrate<S: BoardStore + ?Sized>(store: &S) -> StorageResult<bool> {
    if !store.list().await?.is_empty() {
        return Ok(false);
    }

    info!("Seeding empty store with board {DEFAULT_BOARD_NAME:?} (schema v{SCHEMA_VERSION})");
    let mut board = GameBoard::new(DEFAULT_BOARD_NAME);
    board
        .add_type(DEFAULT_TYPE_NAME, DEFAULT_TYPE_COLOR)
        .map_err(|e| StorageError::Other(e.to_string()))?;
    store.save(&board).await?;
    Ok(true)
}
