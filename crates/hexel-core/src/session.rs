//! The board being edited and the store it came from.
//!
//! An `EditorSession` owns exactly one current board. Edits mark it dirty;
//! switching to another board refuses to drop unsaved edits unless asked to.
//!
//! The session remembers the name the current board is stored under. Saving
//! a board whose name changed since then moves its record to the new name.

use crate::board::{BoardError, GameBoard};
use crate::storage::{self, BoardStore, StorageError};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("Board {0:?} has unsaved changes")]
    UnsavedChanges(String),

    #[error("Board name cannot be empty")]
    EmptyName,

    #[error("Board {0:?} is being edited")]
    BoardInUse(String),

    #[error("Cannot save board {0:?} as itself")]
    SameName(String),

    #[error("A board named {0:?} already exists")]
    NameTaken(String),
}

/// Editing session over a board store
pub struct EditorSession<S: BoardStore> {
    store: S,
    board: GameBoard,
    /// Key of the current board's record in the store
    stored_name: String,
    dirty: bool,
}

impl<S: BoardStore> EditorSession<S> {
    /// Migrate the store and open its first board by name.
    pub async fn open(store: S) -> Result<Self, SessionError> {
        storage::migrate(&store).await?;

        let names = store.list().await?;
        let Some(first) = names.first() else {
            return Err(StorageError::NotFound(storage::DEFAULT_BOARD_NAME.to_string()).into());
        };
        let board = store.load(first).await?;
        info!("Opened board {:?}", board.name());

        Ok(Self {
            stored_name: board.name().to_string(),
            store,
            board,
            dirty: false,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current(&self) -> &GameBoard {
        &self.board
    }

    /// Mutable access to the current board; marks the session dirty.
    ///
    /// A name set through here is checked and moved to on the next [`save`](Self::save).
    pub fn current_mut(&mut self) -> &mut GameBoard {
        self.dirty = true;
        &mut self.board
    }

    /// Run an edit that reports whether it changed the board, such as a
    /// canvas pointer event. Only a reported change marks the session dirty.
    pub fn interact<E>(
        &mut self,
        edit: impl FnOnce(&mut GameBoard) -> Result<bool, E>,
    ) -> Result<bool, E> {
        let modified = edit(&mut self.board)?;
        if modified {
            self.dirty = true;
        }
        Ok(modified)
    }

    /// Run an edit that changes the board whenever it succeeds. A failed edit
    /// leaves the board and the dirty flag as they were.
    pub fn edit<T, E>(&mut self, edit: impl FnOnce(&mut GameBoard) -> Result<T, E>) -> Result<T, E> {
        let value = edit(&mut self.board)?;
        self.dirty = true;
        Ok(value)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Name the current board is stored under
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Rename the current board. The stored record follows on the next save.
    pub async fn rename(&mut self, new_name: &str) -> Result<(), SessionError> {
        if new_name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if new_name == self.board.name() {
            return Ok(());
        }
        if new_name != self.stored_name && self.store.exists(new_name).await? {
            return Err(SessionError::NameTaken(new_name.to_string()));
        }

        info!("Renaming board {:?} to {:?}", self.board.name(), new_name);
        self.board.set_name(new_name);
        self.dirty = true;
        Ok(())
    }

    pub async fn list_names(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.store.list().await?)
    }

    /// Make `name` the current board, refusing while there are unsaved edits
    pub async fn switch_to(&mut self, name: &str) -> Result<(), SessionError> {
        if self.dirty {
            return Err(SessionError::UnsavedChanges(self.board.name().to_string()));
        }
        self.discard_and_switch_to(name).await
    }

    /// Make `name` the current board, dropping unsaved edits
    pub async fn discard_and_switch_to(&mut self, name: &str) -> Result<(), SessionError> {
        let board = self.store.load(name).await?;
        if self.dirty {
            warn!("Discarding unsaved changes to {:?}", self.board.name());
        }
        info!("Editing board {:?}", name);
        self.stored_name = board.name().to_string();
        self.board = board;
        self.dirty = false;
        Ok(())
    }

    /// Write the current board to the store.
    ///
    /// A renamed board is written under its new name and its old record is
    /// deleted. Saving never overwrites another stored board.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        let name = self.board.name().to_string();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        let renamed = name != self.stored_name;
        if renamed && self.store.exists(&name).await? {
            return Err(SessionError::NameTaken(name));
        }

        self.store.save(&self.board).await?;
        if renamed {
            self.store.delete(&self.stored_name).await?;
            info!("Moved board {:?} to {:?}", self.stored_name, name);
            self.stored_name = name;
        }
        info!("Saved board {:?}", self.board.name());
        self.dirty = false;
        Ok(())
    }

    /// Store a copy of board `source` under `new_name`.
    ///
    /// The current board copies its in-memory state; any other source is
    /// copied from the store. The current board stays current.
    pub async fn save_as(&mut self, source: &str, new_name: &str) -> Result<(), SessionError> {
        if new_name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if new_name == source {
            return Err(SessionError::SameName(new_name.to_string()));
        }
        if new_name == self.board.name() || new_name == self.stored_name {
            return Err(SessionError::BoardInUse(new_name.to_string()));
        }

        let mut copy = if source == self.board.name() {
            self.board.clone()
        } else {
            self.store.load(source).await?
        };
        copy.set_name(new_name);
        self.store.save(&copy).await?;
        info!("Saved board {:?} as {:?}", source, new_name);
        Ok(())
    }

    /// Delete a stored board other than the current one
    pub async fn delete(&mut self, name: &str) -> Result<(), SessionError> {
        if name == self.board.name() || name == self.stored_name {
            return Err(SessionError::BoardInUse(name.to_string()));
        }
        self.store.delete(name).await?;
        info!("Deleted board {:?}", name);
        Ok(())
    }
}
