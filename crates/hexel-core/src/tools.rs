//! Editing tools that plug into a [`HexCanvas`](crate::canvas::HexCanvas).
//!
//! Only one tool is active on a canvas at a time. Switching tools means
//! registering another handler, which replaces the previous one.

use crate::board::{BoardError, GameBoard, LabelId, TypeId};
use crate::canvas::{CanvasHandler, CanvasState};
use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the paint tool lays down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Brush {
    Type(TypeId),
    /// Erase painted hexes
    Clear,
}

/// Paints hexes with a type on click and while dragging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintTool {
    pub brush: Brush,
}

impl PaintTool {
    pub fn new(brush: Brush) -> Self {
        Self { brush }
    }

    fn paint(&self, cursor: Option<HexCoord>, board: &mut GameBoard) -> Result<bool, BoardError> {
        let Some(location) = cursor else {
            return Ok(false);
        };
        match self.brush {
            Brush::Clear => {
                if board.hex_at(location).is_none() {
                    return Ok(false);
                }
                board.clear_hex(location);
                Ok(true)
            }
            Brush::Type(type_id) => {
                if board.hex_at(location).map(|hex| hex.type_id) == Some(type_id) {
                    return Ok(false);
                }
                board.set_hex_type(location, type_id)?;
                Ok(true)
            }
        }
    }
}

impl CanvasHandler for PaintTool {
    fn on_click(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        self.paint(state.cursor, board)
    }

    fn on_move(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        if !state.pointer_down {
            return Ok(false);
        }
        self.paint(state.cursor, board)
    }
}

/// Attaches the selected label (or detaches labels, with `None`) on click.
/// Unpainted hexes are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelTool {
    pub label: Option<LabelId>,
}

impl LabelTool {
    pub fn new(label: Option<LabelId>) -> Self {
        Self { label }
    }
}

impl CanvasHandler for LabelTool {
    fn on_click(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        let Some(location) = state.cursor else {
            return Ok(false);
        };
        match board.hex_at(location) {
            Some(hex) if hex.label_id != self.label => {
                board.set_hex_label(location, self.label)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Pins the clicked hex as the canvas focus; clicking it again unpins it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InspectTool;

impl CanvasHandler for InspectTool {
    fn on_click(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        let Some(location) = state.cursor else {
            return Ok(false);
        };
        if board.hex_at(location).is_none() {
            return Ok(false);
        }
        if state.focus == Some(location) {
            debug!("Unfocusing {location}");
            state.focus = None;
        } else {
            state.set_focus_to_cursor();
        }
        Ok(false)
    }
}

/// Any one of the editing tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Paint(PaintTool),
    Label(LabelTool),
    Inspect(InspectTool),
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Inspect(InspectTool)
    }
}

impl CanvasHandler for Tool {
    fn on_click(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        match self {
            Tool::Paint(tool) => tool.on_click(state, board),
            Tool::Label(tool) => tool.on_click(state, board),
            Tool::Inspect(tool) => tool.on_click(state, board),
        }
    }

    fn on_move(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        match self {
            Tool::Paint(tool) => tool.on_move(state, board),
            Tool::Label(tool) => tool.on_move(state, board),
            Tool::Inspect(tool) => tool.on_move(state, board),
        }
    }
}
