//! In-memory canvas store.

use super::{BoxFuture, CanvasStore, RoomRecord, StorageError, StorageResult, StoredShape};
use crate::shapes::Shape;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store for tests and relays without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<String, RoomRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything is persisted for the room.
    pub fn has_room(&self, room: &str) -> bool {
        self.rooms
            .read()
            .map(|rooms| rooms.contains_key(room))
            .unwrap_or(false)
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl CanvasStore for MemoryStore {
    fn fetch_shapes(&self, room: &str) -> BoxFuture<'_, StorageResult<Vec<Shape>>> {
        let room = room.to_string();
        Box::pin(async move {
            let rooms = self.rooms.read().map_err(lock_error)?;
            Ok(rooms.get(&room).map(RoomRecord::shapes).unwrap_or_default())
        })
    }

    fn save_shape(&self, room: &str, user: &str, shape: &Shape) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.to_string();
        let row = StoredShape {
            user_id: user.to_string(),
            shape: shape.clone(),
        };
        Box::pin(async move {
            let mut rooms = self.rooms.write().map_err(lock_error)?;
            let record = rooms.entry(room).or_default();
            record.members.insert(row.user_id.clone());
            record.shapes.push(row);
            Ok(())
        })
    }

    fn leave_or_delete_canvas(&self, room: &str, user: &str) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.to_string();
        let user = user.to_string();
        Box::pin(async move {
            let mut rooms = self.rooms.write().map_err(lock_error)?;
            let empty = rooms.get_mut(&room).is_some_and(|record| record.leave(&user));
            if empty {
                rooms.remove(&room);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ShapeKind, StyleSettings};
    use kurbo::Point;
    use pollster::block_on;

    fn rect(x: f64) -> Shape {
        Shape::from_drag(
            ShapeKind::Rectangle,
            Point::new(x, 0.0),
            Point::new(x + 10.0, 10.0),
            &StyleSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_room_is_empty() {
        let store = MemoryStore::new();
        assert!(block_on(store.fetch_shapes("nowhere")).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_fetch_in_order() {
        let store = MemoryStore::new();
        let a = rect(0.0);
        let b = rect(20.0);
        block_on(store.save_shape("r", "ada", &a)).unwrap();
        block_on(store.save_shape("r", "bob", &b)).unwrap();

        let shapes = block_on(store.fetch_shapes("r")).unwrap();
        assert_eq!(shapes, vec![a, b]);
    }

    #[test]
    fn test_last_member_leaving_deletes_canvas() {
        let store = MemoryStore::new();
        block_on(store.save_shape("r", "ada", &rect(0.0))).unwrap();
        block_on(store.save_shape("r", "bob", &rect(20.0))).unwrap();

        block_on(store.leave_or_delete_canvas("r", "ada")).unwrap();
        assert!(store.has_room("r"));
        assert_eq!(block_on(store.fetch_shapes("r")).unwrap().len(), 2);

        block_on(store.leave_or_delete_canvas("r", "bob")).unwrap();
        assert!(!store.has_room("r"));
    }

    #[test]
    fn test_leave_unknown_room_is_ok() {
        let store = MemoryStore::new();
        assert!(block_on(store.leave_or_delete_canvas("r", "ada")).is_ok());
    }
}
