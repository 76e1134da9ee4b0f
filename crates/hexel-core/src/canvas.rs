//! Interactive hex canvas: pointer tracking, picking and rendering.
//!
//! `HexCanvas` keeps the hex under the pointer (the cursor), an optional
//! pinned hex (the focus) and whether the pointer is held down. Pointer
//! events are resolved to hexes with [`HexCoord::from_pixel`], handed to the
//! registered [`CanvasHandler`], and then the board is redrawn onto a
//! [`DrawSurface`].
//!
//! Handlers always run before the render of the same event, so a frame never
//! shows a half-applied edit.

use crate::board::{BoardError, GameBoard, HexDetails};
use crate::color::Rgb;
use crate::hex::{HexCoord, DEFAULT_RADIUS};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::error;

/// Errors raised while handling a pointer event or drawing a frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("Could not draw {} hexes without a resolvable type", .0.len())]
    UnresolvedHexes(Vec<HexCoord>),

    #[error("Drawing surface error: {0}")]
    Surface(String),
}

/// Text extents as reported by the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub actual_bounding_box_left: f64,
    pub actual_bounding_box_right: f64,
    pub actual_bounding_box_ascent: f64,
}

impl TextMetrics {
    /// Ink width of the measured text
    pub fn width(&self) -> f64 {
        self.actual_bounding_box_left.abs() + self.actual_bounding_box_right.abs()
    }
}

/// A 2D surface the canvas draws onto.
///
/// The browser implementation wraps an HTML canvas; tests use
/// [`RecordingSurface`].
pub trait DrawSurface {
    /// Size the surface is laid out at
    fn display_size(&self) -> Size;

    /// Resize the backing buffer
    fn resize(&mut self, size: Size);

    /// Top-left corner of the surface in client (pointer event) coordinates
    fn client_origin(&self) -> Point;

    fn fill_rect(&mut self, rect: Rect, color: Rgb);

    fn fill_polygon(&mut self, points: &[Point], color: Rgb);

    fn stroke_polygon(&mut self, points: &[Point], color: Rgb, line_width: f64);

    /// Measure `text` as it would be drawn with `font`
    fn measure_text(&mut self, text: &str, font: &str) -> Result<TextMetrics, CanvasError>;

    /// Draw `text` with its baseline-left corner at `origin`
    fn fill_text(&mut self, text: &str, font: &str, origin: Point, color: Rgb)
        -> Result<(), CanvasError>;
}

/// Colors and line widths used when drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasStyle {
    pub background: Rgb,
    /// Width of the contrast outline around every painted hex
    pub outline_width: f64,
    pub cursor_color: Rgb,
    pub cursor_width: f64,
    pub focus_color: Rgb,
    pub focus_width: f64,
    /// CSS font used for label text
    pub font: String,
    /// Whether the hex under the pointer is highlighted
    pub render_cursor: bool,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            background: Rgb::new(0xBB, 0xBB, 0xBB),
            outline_width: 2.0,
            cursor_color: Rgb::new(0xFF, 0xFF, 0x00),
            cursor_width: 2.0,
            focus_color: Rgb::new(0x00, 0x7C, 0x88),
            focus_width: 7.0,
            font: "10px sans-serif".to_string(),
            render_cursor: true,
        }
    }
}

impl CanvasStyle {
    /// Set the background color.
    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = color;
        self
    }

    /// Set the cursor highlight color and width.
    pub fn with_cursor(mut self, color: Rgb, width: f64) -> Self {
        self.cursor_color = color;
        self.cursor_width = width;
        self
    }

    /// Set the focus highlight color and width.
    pub fn with_focus(mut self, color: Rgb, width: f64) -> Self {
        self.focus_color = color;
        self.focus_width = width;
        self
    }

    /// Set the label font.
    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    /// Enable or disable the cursor highlight.
    pub fn with_render_cursor(mut self, render_cursor: bool) -> Self {
        self.render_cursor = render_cursor;
        self
    }
}

/// Pointer state of a canvas, visible to handlers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasState {
    /// Hex under the pointer
    pub cursor: Option<HexCoord>,
    /// Hex pinned for editing, independent of the pointer
    pub focus: Option<HexCoord>,
    pub pointer_down: bool,
    /// Radius of the board last drawn or picked against
    pub radius: f64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            cursor: None,
            focus: None,
            pointer_down: false,
            radius: DEFAULT_RADIUS,
        }
    }
}

impl CanvasState {
    /// Pin the hex currently under the pointer
    pub fn set_focus_to_cursor(&mut self) {
        self.focus = self.cursor;
    }
}

/// Reacts to clicks and pointer moves on a canvas.
///
/// Both methods return whether the board was modified.
pub trait CanvasHandler {
    fn on_click(&mut self, _state: &mut CanvasState, _board: &mut GameBoard) -> Result<bool, BoardError> {
        Ok(false)
    }

    fn on_move(&mut self, _state: &mut CanvasState, _board: &mut GameBoard) -> Result<bool, BoardError> {
        Ok(false)
    }
}

/// Lets the owner keep a handle on a handler it registered.
impl<T: CanvasHandler> CanvasHandler for Rc<RefCell<T>> {
    fn on_click(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        self.borrow_mut().on_click(state, board)
    }

    fn on_move(&mut self, state: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
        self.borrow_mut().on_move(state, board)
    }
}

#[derive(Clone, Copy)]
enum PointerAction {
    Click,
    Move,
}

/// A pointer driven view of a board
#[derive(Default)]
pub struct HexCanvas {
    state: CanvasState,
    style: CanvasStyle,
    handler: Option<Box<dyn CanvasHandler>>,
}

impl HexCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: CanvasStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CanvasState {
        &mut self.state
    }

    pub fn style(&self) -> &CanvasStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: CanvasStyle) {
        self.style = style;
    }

    pub fn cursor(&self) -> Option<HexCoord> {
        self.state.cursor
    }

    pub fn focus(&self) -> Option<HexCoord> {
        self.state.focus
    }

    pub fn set_focus(&mut self, focus: Option<HexCoord>) {
        self.state.focus = focus;
    }

    pub fn set_focus_to_cursor(&mut self) {
        self.state.set_focus_to_cursor();
    }

    /// Register the handler for clicks and moves, returning the one it replaces
    pub fn set_handler(
        &mut self,
        handler: Box<dyn CanvasHandler>,
    ) -> Option<Box<dyn CanvasHandler>> {
        self.handler.replace(handler)
    }

    pub fn clear_handler(&mut self) -> Option<Box<dyn CanvasHandler>> {
        self.handler.take()
    }

    /// Details of the focused hex, if it is painted
    pub fn focus_details<'a>(&self, board: &'a GameBoard) -> Result<Option<HexDetails<'a>>, BoardError> {
        match self.state.focus {
            Some(focus) => board.details_at(focus),
            None => Ok(None),
        }
    }

    // ==================== Pointer events ====================

    /// Pointer pressed: notify the handler, then redraw.
    ///
    /// Returns whether the handler modified the board.
    pub fn pointer_down(
        &mut self,
        board: &mut GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<bool, CanvasError> {
        self.state.pointer_down = true;
        self.dispatch(PointerAction::Click, board, surface)
    }

    /// Pointer moved to `client` (in client coordinates): update the cursor,
    /// notify the handler, then redraw.
    pub fn pointer_move(
        &mut self,
        client: Point,
        board: &mut GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<bool, CanvasError> {
        self.update_cursor(client, board, surface);
        self.dispatch(PointerAction::Move, board, surface)
    }

    pub fn pointer_up(
        &mut self,
        board: &GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<(), CanvasError> {
        self.state.pointer_down = false;
        self.render(board, surface)
    }

    /// Pointer left the surface: release, drop the cursor and redraw
    pub fn pointer_leave(
        &mut self,
        board: &mut GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<bool, CanvasError> {
        self.state.pointer_down = false;
        self.state.cursor = None;
        self.dispatch(PointerAction::Move, board, surface)
    }

    /// A touch starts: the touched hex becomes the cursor before the press
    pub fn touch_start(
        &mut self,
        client: Point,
        board: &mut GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<bool, CanvasError> {
        self.update_cursor(client, board, surface);
        self.pointer_down(board, surface)
    }

    pub fn touch_move(
        &mut self,
        client: Point,
        board: &mut GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<bool, CanvasError> {
        self.pointer_move(client, board, surface)
    }

    /// Touch ended or was cancelled
    pub fn touch_end(
        &mut self,
        board: &GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<(), CanvasError> {
        self.pointer_up(board, surface)
    }

    fn update_cursor(&mut self, client: Point, board: &GameBoard, surface: &dyn DrawSurface) {
        let origin = surface.client_origin();
        let local = Point::new(client.x - origin.x, client.y - origin.y);
        self.state.radius = board.radius();
        self.state.cursor = Some(HexCoord::from_pixel(local, self.state.radius));
    }

    fn dispatch(
        &mut self,
        action: PointerAction,
        board: &mut GameBoard,
        surface: &mut dyn DrawSurface,
    ) -> Result<bool, CanvasError> {
        let handled = match self.handler.as_mut() {
            Some(handler) => match action {
                PointerAction::Click => handler.on_click(&mut self.state, board),
                PointerAction::Move => handler.on_move(&mut self.state, board),
            },
            None => Ok(false),
        };

        // Redraw even when the handler refused the edit: the cursor may have moved
        let rendered = self.render(board, surface);
        let modified = handled?;
        rendered?;
        Ok(modified)
    }

    // ==================== Rendering ====================

    /// Draw the whole board, then the cursor and focus highlights.
    ///
    /// Hexes are drawn in board order. A hex whose type cannot be resolved is
    /// logged and skipped, and the skipped hexes are reported in
    /// [`CanvasError::UnresolvedHexes`]. A label that fails to draw is logged
    /// too; the frame is finished and the first such error is returned.
    pub fn render(&mut self, board: &GameBoard, surface: &mut dyn DrawSurface) -> Result<(), CanvasError> {
        self.state.radius = board.radius();
        let radius = self.state.radius;

        let size = surface.display_size();
        surface.resize(size);
        surface.fill_rect(size.to_rect(), self.style.background);

        let mut unresolved = Vec::new();
        let mut text_error = None;
        for hex in board.hexes() {
            let details = match board.details(hex) {
                Ok(details) => details,
                Err(err) => {
                    error!("Tried to draw hex {} without details: {err}", hex.location);
                    unresolved.push(hex.location);
                    continue;
                }
            };

            let polygon = hex.location.polygon(radius);
            let fill = details.hex_type.color;
            let contrast = fill.contrast();
            surface.stroke_polygon(&polygon, contrast, self.style.outline_width);
            surface.fill_polygon(&polygon, fill);

            if let Some(label) = details.label {
                if let Err(err) = self.draw_hex_text(surface, hex.location, &label.short_label, contrast) {
                    error!("Could not draw label {:?} on hex {}: {err}", label.short_label, hex.location);
                    text_error.get_or_insert(err);
                }
            }
        }

        if self.style.render_cursor {
            if let Some(cursor) = self.state.cursor {
                surface.stroke_polygon(
                    &cursor.polygon(radius),
                    self.style.cursor_color,
                    self.style.cursor_width,
                );
            }
        }
        if let Some(focus) = self.state.focus {
            surface.stroke_polygon(
                &focus.polygon(radius),
                self.style.focus_color,
                self.style.focus_width,
            );
        }

        if let Some(err) = text_error {
            return Err(err);
        }
        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(CanvasError::UnresolvedHexes(unresolved))
        }
    }

    /// Center `text` in the hex using the measured ink box
    fn draw_hex_text(
        &self,
        surface: &mut dyn DrawSurface,
        location: HexCoord,
        text: &str,
        color: Rgb,
    ) -> Result<(), CanvasError> {
        let center = location.to_pixel_center(self.state.radius);
        let metrics = surface.measure_text(text, &self.style.font)?;
        let origin = Point::new(
            center.x - metrics.width() / 2.0,
            center.y + metrics.actual_bounding_box_ascent / 2.0,
        );
        surface.fill_text(text, &self.style.font, origin, color)
    }
}

/// A drawing command captured by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Resize(Size),
    FillRect { rect: Rect, color: Rgb },
    FillPolygon { points: Vec<Point>, color: Rgb },
    StrokePolygon { points: Vec<Point>, color: Rgb, line_width: f64 },
    FillText { text: String, origin: Point, color: Rgb },
}

/// Headless surface that records what was drawn.
///
/// Text is measured as a fixed advance per character, with no left bearing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSurface {
    pub size: Size,
    pub origin: Point,
    pub char_width: f64,
    pub ascent: f64,
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            origin: Point::ZERO,
            char_width: 6.0,
            ascent: 8.0,
            commands: Vec::new(),
        }
    }

    /// Place the surface at `origin` in client coordinates
    pub fn at(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Drop everything recorded so far
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Strokes drawn with `color`
    pub fn strokes_with(&self, color: Rgb) -> Vec<&DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokePolygon { color: stroke, .. } if *stroke == color))
            .collect()
    }

    /// Texts drawn, in order
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn display_size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.commands.push(DrawCommand::Resize(size));
    }

    fn client_origin(&self) -> Point {
        self.origin
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgb) {
        self.commands.push(DrawCommand::FillPolygon {
            points: points.to_vec(),
            color,
        });
    }

    fn stroke_polygon(&mut self, points: &[Point], color: Rgb, line_width: f64) {
        self.commands.push(DrawCommand::StrokePolygon {
            points: points.to_vec(),
            color,
            line_width,
        });
    }

    fn measure_text(&mut self, text: &str, _font: &str) -> Result<TextMetrics, CanvasError> {
        Ok(TextMetrics {
            actual_bounding_box_left: 0.0,
            actual_bounding_box_right: text.chars().count() as f64 * self.char_width,
            actual_bounding_box_ascent: self.ascent,
        })
    }

    fn fill_text(&mut self, text: &str, _font: &str, origin: Point, color: Rgb) -> Result<(), CanvasError> {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            origin,
            color,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::hex_height;

    struct CountingHandler {
        clicks: Rc<RefCell<u32>>,
        moves: Rc<RefCell<u32>>,
    }

    impl CanvasHandler for CountingHandler {
        fn on_click(&mut self, _: &mut CanvasState, _: &mut GameBoard) -> Result<bool, BoardError> {
            *self.clicks.borrow_mut() += 1;
            Ok(false)
        }

        fn on_move(&mut self, _: &mut CanvasState, _: &mut GameBoard) -> Result<bool, BoardError> {
            *self.moves.borrow_mut() += 1;
            Ok(false)
        }
    }

    fn surface() -> RecordingSurface {
        RecordingSurface::new(Size::new(400.0, 300.0))
    }

    fn board() -> GameBoard {
        let mut board = GameBoard::new("Test");
        board.add_type("Grass", "#FFFFFF").unwrap();
        board.add_type("Night", "#000000").unwrap();
        board
    }

    #[test]
    fn test_render_empty_board_fills_background() {
        let mut canvas = HexCanvas::new();
        let mut surface = surface();
        canvas.render(&board(), &mut surface).unwrap();

        assert_eq!(surface.commands.len(), 2);
        assert_eq!(surface.commands[0], DrawCommand::Resize(Size::new(400.0, 300.0)));
        assert_eq!(
            surface.commands[1],
            DrawCommand::FillRect {
                rect: Rect::new(0.0, 0.0, 400.0, 300.0),
                color: Rgb::new(0xBB, 0xBB, 0xBB),
            }
        );
    }

    #[test]
    fn test_render_outlines_with_contrast() {
        let mut board = board();
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_type(HexCoord::new(1, 0), 1).unwrap();

        let mut canvas = HexCanvas::new();
        let mut surface = surface();
        canvas.render(&board, &mut surface).unwrap();

        let white_hex = HexCoord::new(0, 0).polygon(30.0).to_vec();
        assert!(surface.commands.contains(&DrawCommand::StrokePolygon {
            points: white_hex.clone(),
            color: Rgb::BLACK,
            line_width: 2.0,
        }));
        assert!(surface.commands.contains(&DrawCommand::FillPolygon {
            points: white_hex,
            color: Rgb::WHITE,
        }));
        assert!(surface.commands.contains(&DrawCommand::FillPolygon {
            points: HexCoord::new(1, 0).polygon(30.0).to_vec(),
            color: Rgb::BLACK,
        }));
    }

    #[test]
    fn test_label_text_is_centered_from_metrics() {
        let mut board = board();
        let label = board.create_label("Terrain", "Fo", "Forest");
        board.set_hex_type(HexCoord::new(2, 1), 1).unwrap();
        board.set_hex_label(HexCoord::new(2, 1), Some(label)).unwrap();

        let mut canvas = HexCanvas::new();
        let mut surface = surface();
        canvas.render(&board, &mut surface).unwrap();

        let center = HexCoord::new(2, 1).to_pixel_center(30.0);
        assert!(surface.commands.contains(&DrawCommand::FillText {
            text: "Fo".to_string(),
            origin: Point::new(center.x - 6.0, center.y + 4.0),
            color: Rgb::WHITE,
        }));
    }

    /// Records like [`RecordingSurface`] but cannot measure text
    struct NoFontSurface(RecordingSurface);

    impl DrawSurface for NoFontSurface {
        fn display_size(&self) -> Size {
            self.0.display_size()
        }

        fn resize(&mut self, size: Size) {
            self.0.resize(size)
        }

        fn client_origin(&self) -> Point {
            self.0.client_origin()
        }

        fn fill_rect(&mut self, rect: Rect, color: Rgb) {
            self.0.fill_rect(rect, color)
        }

        fn fill_polygon(&mut self, points: &[Point], color: Rgb) {
            self.0.fill_polygon(points, color)
        }

        fn stroke_polygon(&mut self, points: &[Point], color: Rgb, line_width: f64) {
            self.0.stroke_polygon(points, color, line_width)
        }

        fn measure_text(&mut self, _text: &str, font: &str) -> Result<TextMetrics, CanvasError> {
            Err(CanvasError::Surface(format!("font {font:?} not loaded")))
        }

        fn fill_text(&mut self, text: &str, font: &str, origin: Point, color: Rgb) -> Result<(), CanvasError> {
            self.0.fill_text(text, font, origin, color)
        }
    }

    #[test]
    fn test_text_failure_finishes_the_frame() {
        let mut board = board();
        let label = board.create_label("Terrain", "Fo", "Forest");
        board.set_hex_type(HexCoord::new(1, 0), 0).unwrap();
        board.set_hex_label(HexCoord::new(1, 0), Some(label)).unwrap();
        board.set_hex_type(HexCoord::new(2, 2), 1).unwrap();

        let mut canvas = HexCanvas::new();
        canvas.set_focus(Some(HexCoord::new(2, 2)));
        let mut surface = NoFontSurface(surface());

        let result = canvas.render(&board, &mut surface);
        assert!(matches!(result, Err(CanvasError::Surface(_))));

        let fills: Vec<&DrawCommand> = surface
            .0
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillPolygon { .. }))
            .collect();
        assert_eq!(fills.len(), 2);
        assert!(surface.0.texts().is_empty());
        assert_eq!(surface.0.strokes_with(CanvasStyle::default().focus_color).len(), 1);
    }

    #[test]
    fn test_hexes_are_drawn_in_paint_order() {
        let mut board = board();
        board.set_hex_type(HexCoord::new(3, 0), 0).unwrap();
        board.set_hex_type(HexCoord::new(0, 0), 1).unwrap();
        board.set_hex_type(HexCoord::new(3, 0), 1).unwrap();

        let mut canvas = HexCanvas::new();
        let mut surface = surface();
        canvas.render(&board, &mut surface).unwrap();

        let filled: Vec<Vec<Point>> = surface
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillPolygon { points, .. } => Some(points.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            filled,
            vec![
                HexCoord::new(3, 0).polygon(30.0).to_vec(),
                HexCoord::new(0, 0).polygon(30.0).to_vec(),
            ]
        );
    }

    #[test]
    fn test_pointer_move_picks_relative_to_origin() {
        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface().at(Point::new(100.0, 50.0));

        let target = HexCoord::new(3, 2).to_pixel_center(30.0);
        canvas
            .pointer_move(Point::new(target.x + 100.0, target.y + 50.0), &mut board, &mut surface)
            .unwrap();

        assert_eq!(canvas.cursor(), Some(HexCoord::new(3, 2)));
    }

    #[test]
    fn test_picking_uses_board_radius() {
        let mut board = board();
        board.set_radius(60.0);
        let mut canvas = HexCanvas::new();
        let mut surface = surface();

        canvas
            .pointer_move(Point::new(0.0, hex_height(60.0)), &mut board, &mut surface)
            .unwrap();
        assert_eq!(canvas.cursor(), Some(HexCoord::new(0, 1)));
        assert_eq!(canvas.state().radius, 60.0);
    }

    #[test]
    fn test_cursor_and_focus_highlights() {
        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface();

        canvas.pointer_move(Point::new(0.0, 0.0), &mut board, &mut surface).unwrap();
        canvas.set_focus_to_cursor();
        surface.clear();
        canvas.render(&board, &mut surface).unwrap();

        let style = CanvasStyle::default();
        assert_eq!(surface.strokes_with(style.cursor_color).len(), 1);
        assert_eq!(surface.strokes_with(style.focus_color).len(), 1);
        // Focus is drawn last, on top of the cursor
        assert!(matches!(
            surface.commands.last(),
            Some(DrawCommand::StrokePolygon { line_width, .. }) if *line_width == 7.0
        ));
    }

    #[test]
    fn test_cursor_highlight_can_be_disabled() {
        let mut board = board();
        let style = CanvasStyle::default().with_render_cursor(false);
        let mut canvas = HexCanvas::with_style(style.clone());
        let mut surface = surface();

        canvas.pointer_move(Point::new(0.0, 0.0), &mut board, &mut surface).unwrap();
        assert!(surface.strokes_with(style.cursor_color).is_empty());
    }

    #[test]
    fn test_focus_is_copied_not_tracked() {
        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface();

        canvas.pointer_move(Point::new(0.0, 0.0), &mut board, &mut surface).unwrap();
        canvas.set_focus_to_cursor();
        let far = HexCoord::new(4, 3).to_pixel_center(30.0);
        canvas.pointer_move(far, &mut board, &mut surface).unwrap();

        assert_eq!(canvas.focus(), Some(HexCoord::new(0, 0)));
        assert_eq!(canvas.cursor(), Some(HexCoord::new(4, 3)));
    }

    #[test]
    fn test_pointer_lifecycle() {
        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface();

        canvas.pointer_down(&mut board, &mut surface).unwrap();
        assert!(canvas.state().pointer_down);
        canvas.pointer_up(&board, &mut surface).unwrap();
        assert!(!canvas.state().pointer_down);

        canvas.pointer_move(Point::new(10.0, 10.0), &mut board, &mut surface).unwrap();
        canvas.pointer_down(&mut board, &mut surface).unwrap();
        canvas.pointer_leave(&mut board, &mut surface).unwrap();
        assert!(!canvas.state().pointer_down);
        assert_eq!(canvas.cursor(), None);
    }

    #[test]
    fn test_handler_is_replaced_not_stacked() {
        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface();

        let first = CountingHandler {
            clicks: Rc::new(RefCell::new(0)),
            moves: Rc::new(RefCell::new(0)),
        };
        let first_clicks = first.clicks.clone();
        let second = CountingHandler {
            clicks: Rc::new(RefCell::new(0)),
            moves: Rc::new(RefCell::new(0)),
        };
        let second_clicks = second.clicks.clone();
        let second_moves = second.moves.clone();

        assert!(canvas.set_handler(Box::new(first)).is_none());
        assert!(canvas.set_handler(Box::new(second)).is_some());

        canvas.pointer_down(&mut board, &mut surface).unwrap();
        canvas.pointer_move(Point::new(5.0, 5.0), &mut board, &mut surface).unwrap();
        canvas.pointer_leave(&mut board, &mut surface).unwrap();

        assert_eq!(*first_clicks.borrow(), 0);
        assert_eq!(*second_clicks.borrow(), 1);
        assert_eq!(*second_moves.borrow(), 2);
    }

    #[test]
    fn test_touch_start_sets_cursor_before_click() {
        struct FocusOnClick;
        impl CanvasHandler for FocusOnClick {
            fn on_click(&mut self, state: &mut CanvasState, _: &mut GameBoard) -> Result<bool, BoardError> {
                state.set_focus_to_cursor();
                Ok(false)
            }
        }

        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface();
        canvas.set_handler(Box::new(FocusOnClick));

        let target = HexCoord::new(2, 2).to_pixel_center(30.0);
        canvas.touch_start(target, &mut board, &mut surface).unwrap();
        assert_eq!(canvas.focus(), Some(HexCoord::new(2, 2)));
        assert!(canvas.state().pointer_down);

        canvas.touch_end(&board, &mut surface).unwrap();
        assert!(!canvas.state().pointer_down);
    }

    #[test]
    fn test_handler_error_still_redraws() {
        struct Failing;
        impl CanvasHandler for Failing {
            fn on_click(&mut self, _: &mut CanvasState, board: &mut GameBoard) -> Result<bool, BoardError> {
                board.set_hex_type(HexCoord::new(0, 0), 99)?;
                Ok(true)
            }
        }

        let mut board = board();
        let mut canvas = HexCanvas::new();
        let mut surface = surface();
        canvas.set_handler(Box::new(Failing));

        let result = canvas.pointer_down(&mut board, &mut surface);
        assert_eq!(
            result,
            Err(CanvasError::Board(BoardError::InvalidTypeReference(99)))
        );
        assert!(!surface.commands.is_empty());
        assert_eq!(board.hex_count(), 0);
    }

    #[test]
    fn test_focus_details() {
        let mut board = board();
        board.set_hex_type(HexCoord::new(1, 1), 0).unwrap();
        let mut canvas = HexCanvas::new();

        assert_eq!(canvas.focus_details(&board), Ok(None));
        canvas.set_focus(Some(HexCoord::new(1, 1)));
        let details = canvas.focus_details(&board).unwrap().unwrap();
        assert_eq!(details.hex_type.name, "Grass");
    }

    #[test]
    fn test_style_from_partial_json() {
        let style: CanvasStyle =
            serde_json::from_str(r##"{ "background": "#202020", "renderCursor": false }"##).unwrap();
        assert_eq!(style.background, Rgb::new(0x20, 0x20, 0x20));
        assert!(!style.render_cursor);
        assert_eq!(style.focus_width, 7.0);
    }
}
