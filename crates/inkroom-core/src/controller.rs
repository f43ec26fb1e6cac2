//! The per-client interaction state machine.
//!
//! [`InteractionController`] turns pointer and keyboard input into shape
//! mutations, applies them to the local list, and broadcasts them through a
//! [`SyncClient`]. Remote messages come back in through
//! [`InteractionController::handle_remote`].

use crate::canvas::CanvasDocument;
use crate::eraser::EraserEngine;
use crate::input::{Key, PointerSample};
use crate::selection::{CursorHint, SelectionManager};
use crate::shapes::{ApproxTextMeasure, Shape, ShapeId, StyleSettings, TextMeasure};
use crate::storage::CanvasStore;
use crate::sync::{self, SyncClient, SyncEvent, Transport, WireMessage};
use crate::tools::{ToolKind, ToolManager};
use kurbo::{Point, Rect};

/// What the controller is doing with the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Sizing a drag-drawn shape.
    Drawing,
    Moving,
    Resizing,
    Rotating,
    MarqueeSelecting,
    FreehandDrawing,
    Erasing,
    /// The inline text overlay is open.
    TextEditing,
}

/// Inline text entry at a canvas position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub origin: Point,
    pub buffer: String,
}

/// Everything the renderer needs for one frame.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Shapes in paint order.
    pub shapes: &'a [Shape],
    /// Live preview of a shape being drawn; not part of the list.
    pub preview: Option<Shape>,
    pub selected: Option<&'a Shape>,
    pub marquee: Option<Rect>,
    pub overlay: Option<&'a TextOverlay>,
}

pub struct InteractionController<T: Transport> {
    canvas: CanvasDocument,
    selection: SelectionManager,
    tools: ToolManager,
    settings: StyleSettings,
    sync: SyncClient<T>,
    text_measure: Box<dyn TextMeasure>,
    state: InteractionState,
    overlay: Option<TextOverlay>,
    last_point: Point,
    over_surface: bool,
    needs_redraw: bool,
}

impl<T: Transport> InteractionController<T> {
    /// Build a controller over an already loaded shape list. Sends nothing.
    pub fn new(client: SyncClient<T>, shapes: Vec<Shape>, settings: StyleSettings) -> Self {
        Self {
            canvas: CanvasDocument::from_shapes(shapes),
            selection: SelectionManager::new(),
            tools: ToolManager::new(),
            settings,
            sync: client,
            text_measure: Box::new(ApproxTextMeasure::default()),
            state: InteractionState::Idle,
            overlay: None,
            last_point: Point::ZERO,
            over_surface: true,
            needs_redraw: true,
        }
    }

    /// Load the room's persisted shapes, then join the room.
    ///
    /// A failed fetch starts from an empty canvas.
    pub async fn bootstrap<S: CanvasStore + ?Sized>(
        room: &str,
        store: &S,
        transport: T,
        settings: StyleSettings,
    ) -> Self {
        Self::bootstrap_with(SyncClient::new(room, transport), store, settings).await
    }

    /// [`bootstrap`](Self::bootstrap) with a preconfigured client, e.g. one
    /// carrying a user id.
    pub async fn bootstrap_with<S: CanvasStore + ?Sized>(
        client: SyncClient<T>,
        store: &S,
        settings: StyleSettings,
    ) -> Self {
        let shapes = match store.fetch_shapes(client.room()).await {
            Ok(shapes) => {
                log::info!("Loaded {} shapes for room {}", shapes.len(), client.room());
                shapes
            }
            Err(e) => {
                log::warn!("Failed to load room {}, starting empty: {}", client.room(), e);
                Vec::new()
            }
        };
        let mut controller = Self::new(client, shapes, settings);
        controller.sync.join();
        controller
    }

    pub fn with_text_measure(mut self, measure: impl TextMeasure + 'static) -> Self {
        self.text_measure = Box::new(measure);
        self
    }

    pub fn canvas(&self) -> &CanvasDocument {
        &self.canvas
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selection.selected()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.current_tool
    }

    pub fn settings(&self) -> &StyleSettings {
        &self.settings
    }

    pub fn overlay(&self) -> Option<&TextOverlay> {
        self.overlay.as_ref()
    }

    pub fn sync(&self) -> &SyncClient<T> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncClient<T> {
        &mut self.sync
    }

    fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Whether a redraw was requested since the last call; resets the flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.needs_redraw, false)
    }

    /// Data for the renderer.
    pub fn render_context(&self) -> Frame<'_> {
        Frame {
            shapes: self.canvas.shapes(),
            preview: self.tools.preview_shape(&self.settings),
            selected: self.selection.selected_shape(&self.canvas),
            marquee: self.selection.marquee_rect(),
            overlay: self.overlay.as_ref(),
        }
    }

    /// Cursor feedback for the host.
    pub fn cursor_at(&self, point: Point) -> CursorHint {
        match self.tools.current_tool {
            ToolKind::Selection => self.selection.cursor_at(&self.canvas, point),
            _ => CursorHint::Default,
        }
    }

    /// Switch tools. The gesture in progress is finished and an open text
    /// overlay is committed first.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.finish_gesture(self.last_point);
        if self.overlay.is_some() {
            self.commit_text();
        }
        self.tools.set_tool(tool);
    }

    /// Change the style for future shapes; a selected shape takes it too.
    pub fn set_style(&mut self, settings: StyleSettings) {
        self.settings = settings;
        if let Some(mut shape) = self.selection.selected_shape(&self.canvas).cloned() {
            shape.restyle(&self.settings);
            self.canvas.update_shape(&shape);
            self.sync.update(&shape);
            self.request_redraw();
        }
    }

    pub fn pointer_down(&mut self, sample: PointerSample) {
        let point = sample.position;
        self.last_point = point;
        self.over_surface = true;

        if self.overlay.is_some() {
            self.commit_text();
            return;
        }
        if self.state != InteractionState::Idle {
            return;
        }

        match self.tools.current_tool {
            ToolKind::Text => {
                self.overlay = Some(TextOverlay {
                    origin: point,
                    buffer: String::new(),
                });
                self.state = InteractionState::TextEditing;
            }
            ToolKind::Eraser => {
                self.state = InteractionState::Erasing;
                self.erase_at(point);
            }
            ToolKind::Freehand => {
                self.tools.begin(sample);
                self.state = InteractionState::FreehandDrawing;
            }
            ToolKind::Selection => self.selection_down(point),
            ToolKind::Rectangle
            | ToolKind::Diamond
            | ToolKind::Ellipse
            | ToolKind::Line
            | ToolKind::Arrow => {
                self.tools.begin(sample);
                self.state = InteractionState::Drawing;
            }
        }
        self.request_redraw();
    }

    fn selection_down(&mut self, point: Point) {
        if let Some(index) = SelectionManager::text_at(self.canvas.shapes(), point) {
            self.selection.select_index(&mut self.canvas, index);
            self.selection.begin_drag(point);
            self.state = InteractionState::Moving;
        } else if self.selection.rotate_handle_hit(&self.canvas, point) {
            self.selection.begin_rotate(&self.canvas);
            self.state = InteractionState::Rotating;
        } else if let Some(handle) = self.selection.resize_handle_at(&self.canvas, point) {
            self.selection.begin_resize(handle, point);
            self.state = InteractionState::Resizing;
        } else if self.selection.select_at(&mut self.canvas, point).is_some() {
            self.selection.begin_drag(point);
            self.state = InteractionState::Moving;
        } else {
            self.selection.begin_marquee(point);
            self.state = InteractionState::MarqueeSelecting;
        }
    }

    pub fn pointer_move(&mut self, sample: PointerSample) {
        let point = sample.position;
        self.last_point = point;
        match self.state {
            InteractionState::Drawing | InteractionState::FreehandDrawing => {
                self.tools.update(sample);
                self.request_redraw();
            }
            InteractionState::Moving
            | InteractionState::Resizing
            | InteractionState::Rotating
            | InteractionState::MarqueeSelecting => {
                if self.selection.update(&mut self.canvas, point) {
                    self.request_redraw();
                }
            }
            InteractionState::Erasing => {
                if self.over_surface {
                    self.erase_at(point);
                }
            }
            InteractionState::Idle | InteractionState::TextEditing => {}
        }
    }

    pub fn pointer_up(&mut self, sample: PointerSample) {
        self.last_point = sample.position;
        self.finish_gesture(sample.position);
    }

    /// The platform cancelled the pointer; finish as if released at the last sample.
    pub fn pointer_cancel(&mut self) {
        self.finish_gesture(self.last_point);
    }

    /// The pointer left the surface; finishes the gesture and stops erasing.
    pub fn pointer_leave(&mut self) {
        self.over_surface = false;
        self.finish_gesture(self.last_point);
    }

    pub fn pointer_enter(&mut self) {
        self.over_surface = true;
    }

    fn finish_gesture(&mut self, point: Point) {
        match self.state {
            InteractionState::Drawing | InteractionState::FreehandDrawing => {
                if let Some(shape) = self.tools.end(point, &self.settings) {
                    self.sync.draw(&shape);
                    self.canvas.add_shape(shape);
                }
            }
            InteractionState::Moving
            | InteractionState::Resizing
            | InteractionState::Rotating
            | InteractionState::MarqueeSelecting => {
                if let Some(shape) = self.selection.finish(&mut self.canvas) {
                    self.sync.update(&shape);
                }
            }
            InteractionState::Erasing => {}
            InteractionState::Idle | InteractionState::TextEditing => return,
        }
        self.state = InteractionState::Idle;
        self.request_redraw();
    }

    fn erase_at(&mut self, point: Point) {
        let eraser = EraserEngine::new(self.settings.eraser_size);
        if let Some(id) = eraser.erase_at(&mut self.canvas, point) {
            log::debug!("Erased shape {}", id);
            if self.selection.is_selected(id) {
                self.selection.clear();
            }
            self.sync.erase(id);
            self.request_redraw();
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if let Some(overlay) = &mut self.overlay {
            match key {
                Key::Char(c) => overlay.buffer.push(c),
                Key::Backspace => {
                    overlay.buffer.pop();
                }
                Key::Enter => self.commit_text(),
                Key::Escape => {
                    self.overlay = None;
                    self.state = InteractionState::Idle;
                }
                Key::Delete => {}
            }
            self.request_redraw();
            return;
        }
        if matches!(key, Key::Delete | Key::Backspace) {
            self.delete_selected();
        }
    }

    fn commit_text(&mut self) {
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        self.state = InteractionState::Idle;
        self.request_redraw();
        if overlay.buffer.trim().is_empty() {
            return;
        }
        let size = self
            .text_measure
            .measure(&overlay.buffer, self.settings.font_size);
        let shape = Shape::text(overlay.origin, overlay.buffer, size, &self.settings);
        self.sync.draw(&shape);
        self.canvas.add_shape(shape);
    }

    /// Remove the selected shape locally and broadcast the erase.
    pub fn delete_selected(&mut self) {
        let Some(id) = self.selection.selected() else {
            return;
        };
        self.canvas.remove_shape(id);
        self.selection.clear();
        if matches!(
            self.state,
            InteractionState::Moving | InteractionState::Resizing | InteractionState::Rotating
        ) {
            self.state = InteractionState::Idle;
        }
        self.sync.erase(id);
        self.request_redraw();
    }

    /// Empty the canvas for everyone in the room.
    pub fn clear_canvas(&mut self) {
        self.canvas.clear();
        self.selection.clear();
        self.sync.clear();
        self.request_redraw();
    }

    /// Leave the room for good.
    pub fn leave(&mut self) {
        self.sync.leave();
    }

    /// Decode and apply a message from the relay. Malformed input is dropped.
    pub fn handle_remote(&mut self, json: &str) {
        match WireMessage::from_json(json) {
            Ok(message) => self.apply_remote(&message),
            Err(e) => log::warn!("Dropping malformed message: {}", e),
        }
    }

    pub fn apply_remote(&mut self, message: &WireMessage) {
        match message {
            WireMessage::Error { message } => {
                log::warn!("Relay error: {}", message);
                return;
            }
            WireMessage::UserConnected { user_id, .. } => {
                log::info!("Peer joined: {}", user_id.as_deref().unwrap_or("anonymous"));
                return;
            }
            WireMessage::UserDisconnected { user_id, .. } => {
                log::info!("Peer left: {}", user_id.as_deref().unwrap_or("anonymous"));
                return;
            }
            _ => {}
        }
        if message.room().is_some_and(|room| room != self.sync.room()) {
            log::debug!("Ignoring message for another room");
            return;
        }
        if sync::apply(&mut self.canvas, message) {
            if let Some(id) = self.selection.selected() {
                if !self.canvas.contains(id) {
                    self.selection.clear();
                }
            }
            self.request_redraw();
        }
    }

    /// Feed an event polled from the transport.
    pub fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Message(message) => self.apply_remote(&message),
            SyncEvent::Connected => log::info!("Connected to relay"),
            SyncEvent::Disconnected => log::warn!("Disconnected from relay"),
            SyncEvent::Error { message } => log::warn!("Connection error: {}", message),
        }
    }
}
