//! Persisted canvas store.
//!
//! The relay serves the initial shape list of a room from a store, and a
//! client fetches it once at startup. In-session edits never reach the store.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

use crate::shapes::Shape;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for store operations, sendable across the relay's tasks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shape row together with the user who saved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredShape {
    pub user_id: String,
    pub shape: Shape,
}

/// Everything persisted for one room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Users holding a stake in the canvas.
    pub members: BTreeSet<String>,
    pub shapes: Vec<StoredShape>,
}

impl RoomRecord {
    pub(crate) fn shapes(&self) -> Vec<Shape> {
        self.shapes.iter().map(|row| row.shape.clone()).collect()
    }

    /// Drop `user` from the members. Returns true when nobody is left and
    /// the whole canvas should be deleted.
    pub(crate) fn leave(&mut self, user: &str) -> bool {
        self.members.remove(user);
        self.members.is_empty()
    }
}

/// Trait for canvas store backends.
pub trait CanvasStore: Send + Sync {
    /// Persisted shapes of a room in paint order; empty for an unknown room.
    fn fetch_shapes(&self, room: &str) -> BoxFuture<'_, StorageResult<Vec<Shape>>>;

    /// Persist a shape row for `user`, making them a member of the room.
    fn save_shape(&self, room: &str, user: &str, shape: &Shape) -> BoxFuture<'_, StorageResult<()>>;

    /// Remove `user` from the room; the last member leaving deletes the canvas.
    fn leave_or_delete_canvas(&self, room: &str, user: &str) -> BoxFuture<'_, StorageResult<()>>;
}
