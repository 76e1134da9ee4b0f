//! WebAssembly bindings for the Hexel editor.
//!
//! This module exposes an editing session over the IndexedDB store, drawn on
//! an HTML canvas, to JavaScript through wasm-bindgen. Every edit and every
//! storage operation goes through the session, so it alone tracks unsaved
//! changes and the name the board is stored under.

use crate::board::{BoardError, HexLabel, HexType};
use crate::canvas::{CanvasError, CanvasStyle, DrawSurface, HexCanvas, TextMetrics};
use crate::color::Rgb;
use crate::hex::HexCoord;
use crate::session::{EditorSession, SessionError};
use crate::tools::{Brush, InspectTool, LabelTool, PaintTool, Tool};
use js_sys::{Array, Promise};
use kurbo::{Point, Rect, Size};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

#[cfg(target_arch = "wasm32")]
type EditorStore = crate::storage::IndexedDbStore;

#[cfg(not(target_arch = "wasm32"))]
type EditorStore = crate::storage::MemoryStore;

type Session = EditorSession<EditorStore>;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Draws onto an HTML canvas through its 2D context
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("Canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, context })
    }

    fn trace(&self, points: &[Point]) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.context.begin_path();
        self.context.move_to(first.x, first.y);
        for point in rest {
            self.context.line_to(point.x, point.y);
        }
        self.context.close_path();
    }
}

impl DrawSurface for CanvasSurface {
    fn display_size(&self) -> Size {
        Size::new(
            self.canvas.client_width() as f64,
            self.canvas.client_height() as f64,
        )
    }

    fn resize(&mut self, size: Size) {
        self.canvas.set_width(size.width as u32);
        self.canvas.set_height(size.height as u32);
    }

    fn client_origin(&self) -> Point {
        let rect = self.canvas.get_bounding_client_rect();
        Point::new(rect.left(), rect.top())
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.context.set_fill_style_str(&color.to_string());
        self.context.fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgb) {
        self.context.set_fill_style_str(&color.to_string());
        self.trace(points);
        self.context.fill();
    }

    fn stroke_polygon(&mut self, points: &[Point], color: Rgb, line_width: f64) {
        self.context.set_stroke_style_str(&color.to_string());
        self.context.set_line_width(line_width);
        self.trace(points);
        self.context.stroke();
    }

    fn measure_text(&mut self, text: &str, font: &str) -> Result<TextMetrics, CanvasError> {
        self.context.set_font(font);
        let metrics = self
            .context
            .measure_text(text)
            .map_err(|e| CanvasError::Surface(format!("{:?}", e)))?;
        Ok(TextMetrics {
            actual_bounding_box_left: metrics.actual_bounding_box_left(),
            actual_bounding_box_right: metrics.actual_bounding_box_right(),
            actual_bounding_box_ascent: metrics.actual_bounding_box_ascent(),
        })
    }

    fn fill_text(&mut self, text: &str, font: &str, origin: Point, color: Rgb) -> Result<(), CanvasError> {
        self.context.set_font(font);
        self.context.set_fill_style_str(&color.to_string());
        self.context
            .fill_text(text, origin.x, origin.y)
            .map_err(|e| CanvasError::Surface(format!("{:?}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FocusJson<'a> {
    key: String,
    hex_type: &'a HexType,
    label: Option<&'a HexLabel>,
}

fn busy() -> JsValue {
    JsValue::from_str("Editor is busy with a storage operation")
}

struct EditorState {
    /// `None` while an async storage operation owns the session
    session: Option<Session>,
    canvas: HexCanvas,
    surface: CanvasSurface,
}

/// Hand the session back after a storage operation and redraw.
///
/// With `reset_view` the focus is dropped first, for when the current board
/// was replaced.
fn restore(state: &RefCell<EditorState>, session: Session, reset_view: bool) -> Result<(), JsValue> {
    let mut state = state.borrow_mut();
    let EditorState { session: slot, canvas, surface } = &mut *state;
    if reset_view {
        canvas.set_focus(None);
    }
    let session = slot.insert(session);
    canvas.render(session.current(), surface).map_err(js_error)
}

fn take_session(state: &RefCell<EditorState>) -> Result<Session, JsValue> {
    state.borrow_mut().session.take().ok_or_else(busy)
}

/// WASM-exposed editor: an editing session drawn on one canvas.
///
/// Created with [`WasmEditor::open`]. Storage methods return Promises; while
/// one is pending, every other method fails with a "busy" error.
#[wasm_bindgen]
pub struct WasmEditor {
    state: Rc<RefCell<EditorState>>,
}

impl WasmEditor {
    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut Session, &mut HexCanvas, &mut CanvasSurface) -> Result<T, JsValue>,
    ) -> Result<T, JsValue> {
        let mut state = self.state.borrow_mut();
        let EditorState { session, canvas, surface } = &mut *state;
        let session = session.as_mut().ok_or_else(busy)?;
        f(session, canvas, surface)
    }

    /// Replace the active tool
    fn use_tool(&self, tool: Tool) -> Result<(), JsValue> {
        self.with_session(|_, canvas, _| {
            canvas.set_handler(Box::new(tool));
            Ok(())
        })
    }

    /// Apply an edit through the session, then redraw
    fn edit_and_render<T>(
        &self,
        edit: impl FnOnce(&mut Session) -> Result<T, BoardError>,
    ) -> Result<T, JsValue> {
        self.with_session(|session, canvas, surface| {
            let value = edit(session).map_err(js_error)?;
            canvas.render(session.current(), surface).map_err(js_error)?;
            Ok(value)
        })
    }

    /// Run a storage operation on the session and resolve to its result
    fn run<T, F, Fut>(&self, reset_view: bool, op: F) -> Promise
    where
        T: Into<JsValue>,
        F: FnOnce(Session) -> Fut + 'static,
        Fut: std::future::Future<Output = (Session, Result<T, SessionError>)> + 'static,
    {
        let state = self.state.clone();
        future_to_promise(async move {
            let session = take_session(&state)?;
            let (session, result) = op(session).await;
            let replaced = reset_view && result.is_ok();
            let restored = restore(&state, session, replaced);
            let value: JsValue = result.map_err(js_error)?.into();
            restored?;
            Ok(value)
        })
    }
}

#[wasm_bindgen]
impl WasmEditor {
    /// Open the stored boards and draw the first one on `canvas`.
    ///
    /// An empty database is seeded with the default board first.
    pub async fn open(canvas: HtmlCanvasElement) -> Result<WasmEditor, JsValue> {
        let surface = CanvasSurface::new(canvas)?;
        let session = EditorSession::open(EditorStore::new()).await.map_err(js_error)?;
        let mut canvas = HexCanvas::new();
        canvas.set_handler(Box::new(Tool::default()));

        let editor = WasmEditor {
            state: Rc::new(RefCell::new(EditorState {
                session: Some(session),
                canvas,
                surface,
            })),
        };
        editor.render()?;
        Ok(editor)
    }

    /// Get the board as stored JSON
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> Result<String, JsValue> {
        self.with_session(|session, _, _| session.current().to_json().map_err(js_error))
    }

    #[wasm_bindgen(js_name = getName)]
    pub fn get_name(&self) -> Result<String, JsValue> {
        self.with_session(|session, _, _| Ok(session.current().name().to_string()))
    }

    #[wasm_bindgen(js_name = isDirty)]
    pub fn is_dirty(&self) -> Result<bool, JsValue> {
        self.with_session(|session, _, _| Ok(session.is_dirty()))
    }

    /// Apply a partial style given as JSON, e.g. `{"renderCursor": false}`
    #[wasm_bindgen(js_name = setStyle)]
    pub fn set_style(&self, style_json: &str) -> Result<(), JsValue> {
        let style: CanvasStyle = serde_json::from_str(style_json).map_err(js_error)?;
        self.with_session(|session, canvas, surface| {
            canvas.set_style(style);
            canvas.render(session.current(), surface).map_err(js_error)
        })
    }

    // ==================== Storage ====================

    /// Resolves to an array of stored board names
    #[wasm_bindgen(js_name = listNames)]
    pub fn list_names(&self) -> Promise {
        self.run(false, |session| async move {
            let names = session
                .list_names()
                .await
                .map(|names| names.into_iter().map(JsValue::from).collect::<Array>());
            (session, names)
        })
    }

    /// Write the current board; a renamed board moves to its new name
    pub fn save(&self) -> Promise {
        self.run(false, |mut session| async move {
            let result = session.save().await.map(|()| JsValue::UNDEFINED);
            (session, result)
        })
    }

    /// Rename the current board; takes effect in the store on the next save
    pub fn rename(&self, name: String) -> Promise {
        self.run(false, |mut session| async move {
            let result = session.rename(&name).await.map(|()| JsValue::UNDEFINED);
            (session, result)
        })
    }

    /// Edit the stored board `name`; rejects while there are unsaved changes
    #[wasm_bindgen(js_name = switchTo)]
    pub fn switch_to(&self, name: String) -> Promise {
        self.run(true, |mut session| async move {
            let result = session.switch_to(&name).await.map(|()| JsValue::UNDEFINED);
            (session, result)
        })
    }

    /// Edit the stored board `name`, dropping unsaved changes
    #[wasm_bindgen(js_name = discardAndSwitchTo)]
    pub fn discard_and_switch_to(&self, name: String) -> Promise {
        self.run(true, |mut session| async move {
            let result = session
                .discard_and_switch_to(&name)
                .await
                .map(|()| JsValue::UNDEFINED);
            (session, result)
        })
    }

    /// Store a copy of board `source` under `new_name`
    #[wasm_bindgen(js_name = saveAs)]
    pub fn save_as(&self, source: String, new_name: String) -> Promise {
        self.run(false, |mut session| async move {
            let result = session
                .save_as(&source, &new_name)
                .await
                .map(|()| JsValue::UNDEFINED);
            (session, result)
        })
    }

    /// Delete a stored board other than the current one
    pub fn delete(&self, name: String) -> Promise {
        self.run(false, |mut session| async move {
            let result = session.delete(&name).await.map(|()| JsValue::UNDEFINED);
            (session, result)
        })
    }

    // ==================== Tools ====================

    #[wasm_bindgen(js_name = usePaint)]
    pub fn use_paint(&self, type_id: u32) -> Result<(), JsValue> {
        self.use_tool(Tool::Paint(PaintTool::new(Brush::Type(type_id))))
    }

    #[wasm_bindgen(js_name = useEraser)]
    pub fn use_eraser(&self) -> Result<(), JsValue> {
        self.use_tool(Tool::Paint(PaintTool::new(Brush::Clear)))
    }

    #[wasm_bindgen(js_name = useLabel)]
    pub fn use_label(&self, label_id: Option<u32>) -> Result<(), JsValue> {
        self.use_tool(Tool::Label(LabelTool::new(label_id)))
    }

    #[wasm_bindgen(js_name = useInspect)]
    pub fn use_inspect(&self) -> Result<(), JsValue> {
        self.use_tool(Tool::Inspect(InspectTool))
    }

    // ==================== Pointer events ====================
    //
    // Each resolves to whether the board was modified. The session records
    // modifications as unsaved changes.

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self) -> Result<bool, JsValue> {
        self.with_session(|session, canvas, surface| {
            session
                .interact(|board| canvas.pointer_down(board, surface))
                .map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, client_x: f64, client_y: f64) -> Result<bool, JsValue> {
        let client = Point::new(client_x, client_y);
        self.with_session(|session, canvas, surface| {
            session
                .interact(|board| canvas.pointer_move(client, board, surface))
                .map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) -> Result<(), JsValue> {
        self.with_session(|session, canvas, surface| {
            canvas.pointer_up(session.current(), surface).map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&self) -> Result<bool, JsValue> {
        self.with_session(|session, canvas, surface| {
            session
                .interact(|board| canvas.pointer_leave(board, surface))
                .map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = touchStart)]
    pub fn touch_start(&self, client_x: f64, client_y: f64) -> Result<bool, JsValue> {
        let client = Point::new(client_x, client_y);
        self.with_session(|session, canvas, surface| {
            session
                .interact(|board| canvas.touch_start(client, board, surface))
                .map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = touchMove)]
    pub fn touch_move(&self, client_x: f64, client_y: f64) -> Result<bool, JsValue> {
        let client = Point::new(client_x, client_y);
        self.with_session(|session, canvas, surface| {
            session
                .interact(|board| canvas.touch_move(client, board, surface))
                .map_err(js_error)
        })
    }

    /// Touch ended or was cancelled
    #[wasm_bindgen(js_name = touchEnd)]
    pub fn touch_end(&self) -> Result<(), JsValue> {
        self.with_session(|session, canvas, surface| {
            canvas.touch_end(session.current(), surface).map_err(js_error)
        })
    }

    pub fn render(&self) -> Result<(), JsValue> {
        self.with_session(|session, canvas, surface| {
            canvas.render(session.current(), surface).map_err(js_error)
        })
    }

    // ==================== Focus ====================

    /// Get the focused hex with its type and label as JSON, or `null`
    #[wasm_bindgen(js_name = getFocus)]
    pub fn get_focus(&self) -> Result<String, JsValue> {
        self.with_session(|session, canvas, _| {
            let board = session.current();
            let (Some(focus), Some(details)) =
                (canvas.focus(), canvas.focus_details(board).map_err(js_error)?)
            else {
                return Ok("null".to_string());
            };
            let json = FocusJson {
                key: focus.key(),
                hex_type: details.hex_type,
                label: details.label,
            };
            serde_json::to_string(&json).map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = clearFocus)]
    pub fn clear_focus(&self) -> Result<(), JsValue> {
        self.with_session(|session, canvas, surface| {
            canvas.set_focus(None);
            canvas.render(session.current(), surface).map_err(js_error)
        })
    }

    // ==================== Board edits ====================

    #[wasm_bindgen(js_name = setRadius)]
    pub fn set_radius(&self, radius: f64) -> Result<(), JsValue> {
        self.edit_and_render(|session| {
            session.current_mut().set_radius(radius);
            Ok(())
        })
    }

    /// Get all hex types as a JSON array
    #[wasm_bindgen(js_name = getTypes)]
    pub fn get_types(&self) -> Result<String, JsValue> {
        self.with_session(|session, _, _| {
            serde_json::to_string(&session.current().types_list()).map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = addType)]
    pub fn add_type(&self, name: &str, color: &str) -> Result<u32, JsValue> {
        self.with_session(|session, _, _| {
            session.edit(|board| board.add_type(name, color)).map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = removeType)]
    pub fn remove_type(&self, type_id: u32) -> Result<(), JsValue> {
        self.edit_and_render(|session| session.edit(|board| board.remove_type(type_id)))
    }

    #[wasm_bindgen(js_name = setTypeColor)]
    pub fn set_type_color(&self, type_id: u32, color: &str) -> Result<(), JsValue> {
        self.edit_and_render(|session| session.edit(|board| board.set_type_color(type_id, color)))
    }

    #[wasm_bindgen(js_name = renameType)]
    pub fn rename_type(&self, type_id: u32, name: &str) -> Result<(), JsValue> {
        self.with_session(|session, _, _| {
            session.edit(|board| board.rename_type(type_id, name)).map_err(js_error)
        })
    }

    /// Keys of all hexes painted with a type, as a JSON array
    #[wasm_bindgen(js_name = queryHexesByType)]
    pub fn query_hexes_by_type(&self, type_id: u32) -> Result<String, JsValue> {
        self.with_session(|session, _, _| {
            serde_json::to_string(&session.current().query_hexes_by_type_id(type_id)).map_err(js_error)
        })
    }

    /// Get labels grouped by category as a JSON array of `[category, labels]`
    #[wasm_bindgen(js_name = getLabelsByCategory)]
    pub fn get_labels_by_category(&self) -> Result<String, JsValue> {
        self.with_session(|session, _, _| {
            serde_json::to_string(&session.current().category_label_map()).map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = createLabel)]
    pub fn create_label(&self, category: &str, short_label: &str, long_label: &str) -> Result<u32, JsValue> {
        self.with_session(|session, _, _| {
            Ok(session.current_mut().create_label(category, short_label, long_label))
        })
    }

    #[wasm_bindgen(js_name = updateLabel)]
    pub fn update_label(
        &self,
        label_id: u32,
        category: &str,
        short_label: &str,
        long_label: &str,
    ) -> Result<(), JsValue> {
        self.edit_and_render(|session| {
            session
                .current_mut()
                .update_label(label_id, category, short_label, long_label);
            Ok(())
        })
    }

    #[wasm_bindgen(js_name = deleteLabel)]
    pub fn delete_label(&self, label_id: u32) -> Result<(), JsValue> {
        self.edit_and_render(|session| session.edit(|board| board.delete_label(label_id)))
    }

    /// Attach a label to the hex at `key` (`"x,y"`), or detach with `undefined`
    #[wasm_bindgen(js_name = setHexLabel)]
    pub fn set_hex_label(&self, key: &str, label_id: Option<u32>) -> Result<(), JsValue> {
        self.edit_and_render(|session| {
            session.edit(|board| board.set_hex_label_by_key(key, label_id))
        })
    }

    #[wasm_bindgen(js_name = clearHex)]
    pub fn clear_hex(&self, key: &str) -> Result<(), JsValue> {
        let location = HexCoord::from_key(key).map_err(js_error)?;
        self.edit_and_render(|session| {
            session.interact(|board| {
                let painted = board.hex_at(location).is_some();
                board.clear_hex(location);
                Ok::<_, BoardError>(painted)
            })?;
            Ok(())
        })
    }

    /// Randomly label hexes of a type, returning how many were labeled
    #[wasm_bindgen(js_name = randomFillLabels)]
    pub fn random_fill_labels(
        &self,
        type_id: u32,
        label_ids: Vec<u32>,
        overwrite: bool,
    ) -> Result<usize, JsValue> {
        self.edit_and_render(|session| {
            let mut filled = 0;
            session.interact(|board| {
                filled = board.random_fill_labels(
                    type_id,
                    &label_ids,
                    overwrite,
                    &mut rand::thread_rng(),
                )?;
                Ok::<_, BoardError>(filled > 0)
            })?;
            Ok(filled)
        })
    }
}
