//! File-based canvas store for native platforms.

use super::{BoxFuture, CanvasStore, RoomRecord, StorageError, StorageResult, StoredShape};
use crate::shapes::Shape;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores one JSON file per room in a directory.
pub struct FileStore {
    base_path: PathBuf,
    /// Serializes read-modify-write cycles on room files.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a new file store with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Create a file store in the default location.
    ///
    /// On Unix: `~/.local/share/inkroom/rooms/`
    /// On Windows: `%LOCALAPPDATA%\inkroom\rooms\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("inkroom").join("rooms"))
    }

    /// Get the file path for a room id.
    fn room_path(&self, room: &str) -> PathBuf {
        let safe_id: String = room
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

fn read_record(path: &Path) -> StorageResult<Option<RoomRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
}

fn write_record(path: &Path, record: &RoomRecord) -> StorageResult<()> {
    let json = serde_json::to_string(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
    fs::write(path, json)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

impl CanvasStore for FileStore {
    fn fetch_shapes(&self, room: &str) -> BoxFuture<'_, StorageResult<Vec<Shape>>> {
        let path = self.room_path(room);
        Box::pin(async move {
            Ok(read_record(&path)?
                .map(|record| record.shapes())
                .unwrap_or_default())
        })
    }

    fn save_shape(&self, room: &str, user: &str, shape: &Shape) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.room_path(room);
        let row = StoredShape {
            user_id: user.to_string(),
            shape: shape.clone(),
        };
        Box::pin(async move {
            let _guard = self
                .write_lock
                .lock()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let mut record = read_record(&path)?.unwrap_or_default();
            record.members.insert(row.user_id.clone());
            record.shapes.push(row);
            write_record(&path, &record)
        })
    }

    fn leave_or_delete_canvas(&self, room: &str, user: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.room_path(room);
        let user = user.to_string();
        Box::pin(async move {
            let _guard = self
                .write_lock
                .lock()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let Some(mut record) = read_record(&path)? else {
                return Ok(());
            };
            if record.leave(&user) {
                log::info!("Deleting canvas file {}", path.display());
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })
            } else {
                write_record(&path, &record)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ShapeKind, StyleSettings};
    use kurbo::Point;
    use pollster::block_on;
    use tempfile::tempdir;

    fn rect() -> Shape {
        Shape::from_drag(
            ShapeKind::Ellipse,
            Point::new(0.0, 0.0),
            Point::new(30.0, 20.0),
            &StyleSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_file_store_save_fetch() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let shape = rect();

        block_on(store.save_shape("room-1", "ada", &shape)).unwrap();
        let loaded = block_on(store.fetch_shapes("room-1")).unwrap();
        assert_eq!(loaded, vec![shape]);
    }

    #[test]
    fn test_file_store_unknown_room() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert!(block_on(store.fetch_shapes("nothing")).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_leave_deletes_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        block_on(store.save_shape("r", "ada", &rect())).unwrap();
        block_on(store.save_shape("r", "bob", &rect())).unwrap();

        block_on(store.leave_or_delete_canvas("r", "ada")).unwrap();
        assert!(dir.path().join("r.json").exists());
        block_on(store.leave_or_delete_canvas("r", "bob")).unwrap();
        assert!(!dir.path().join("r.json").exists());
    }

    #[test]
    fn test_file_store_sanitizes_id() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let shape = rect();

        block_on(store.save_shape("team/room:with*special", "ada", &shape)).unwrap();
        assert!(dir.path().join("team_room_with_special.json").exists());
        let loaded = block_on(store.fetch_shapes("team/room:with*special")).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("bad.json"), "{nope").unwrap();
        assert!(matches!(
            block_on(store.fetch_shapes("bad")),
            Err(StorageError::Serialization(_))
        ));
    }
}
