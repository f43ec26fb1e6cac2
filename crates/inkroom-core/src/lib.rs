//! InkRoom Core Library
//!
//! Platform-agnostic shape model, selection, eraser, interaction controller
//! and sync protocol for the InkRoom collaborative canvas.

pub mod canvas;
pub mod controller;
pub mod eraser;
pub mod input;
pub mod selection;
pub mod shapes;
pub mod storage;
pub mod sync;
pub mod tools;

pub use canvas::CanvasDocument;
pub use controller::{Frame, InteractionController, InteractionState, TextOverlay};
pub use eraser::EraserEngine;
pub use input::{Key, PointerSample};
pub use selection::{CursorHint, Handle, HandleKind, ResizeHandle, SelectionManager};
pub use shapes::{Shape, ShapeError, ShapeId, ShapeKind, ShapeOptions, StyleSettings};
pub use storage::{CanvasStore, MemoryStore, StorageError};
pub use sync::{ConnectionState, Outbox, SyncClient, SyncError, SyncEvent, Transport, WireMessage};
#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
pub use tools::{ToolKind, ToolManager};
