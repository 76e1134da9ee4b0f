//! Hexel - a hex-board editor core
//!
//! This crate provides the core logic for Hexel, including:
//! - Offset hex coordinates and the pixel geometry of a flat-top grid
//! - Board representation with hex types, labels and painted hexes
//! - An interactive canvas that picks hexes under the pointer and draws boards
//! - Editing tools, persistence and an editing session
//!
//! # Architecture
//!
//! The editor core is platform-agnostic. It can be compiled to:
//! - Native Rust, drawing onto any [`canvas::DrawSurface`] and storing boards as files
//! - WebAssembly, drawing onto an HTML canvas and storing boards in IndexedDB
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system and geometry engine
//! - [`color`]: Color parsing and contrast selection
//! - [`board`]: Board model with referential integrity between hexes, types and labels
//! - [`canvas`]: Pointer handling and rendering
//! - [`tools`]: Paint, label and inspect tools
//! - [`storage`]: Board stores
//! - [`session`]: The current board and its unsaved state

pub mod board;
pub mod canvas;
pub mod color;
pub mod hex;
pub mod session;
pub mod storage;
pub mod tools;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use board::{BoardError, BoardSnapshot, GameBoard, HexDetails, HexLabel, HexSpace, HexType, LabelId, TypeId};
pub use canvas::{CanvasError, CanvasHandler, CanvasState, CanvasStyle, DrawSurface, HexCanvas};
pub use color::{contrast_color, ColorError, Rgb};
pub use hex::{hex_height, hex_polygon, hex_width, HexCoord, InvalidHexKey};
pub use session::{EditorSession, SessionError};
pub use storage::{BoardStore, MemoryStore, StorageError};
pub use tools::{Brush, InspectTool, LabelTool, PaintTool, Tool};
