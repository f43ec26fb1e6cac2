//! The ordered shape list of one room.

use crate::shapes::{Shape, ShapeId};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// All shapes of a canvas, back to front.
///
/// The list is a plain `Vec`: the last entry is the topmost. Ids are unique
/// in practice, but remote `canvas:draw` messages are appended without
/// deduplication, so every id-based operation handles repeated ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasDocument {
    shapes: Vec<Shape>,
}

impl CanvasDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        Self { shapes }
    }

    /// Shapes in paint order (back to front).
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn into_shapes(self) -> Vec<Shape> {
        self.shapes
    }

    /// Append a shape on top.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Merge `incoming` into every entry with its id.
    /// Returns the number of entries touched.
    pub fn update_shape(&mut self, incoming: &Shape) -> usize {
        let mut touched = 0;
        for shape in self.shapes.iter_mut().filter(|s| s.id == incoming.id) {
            shape.merge(incoming);
            touched += 1;
        }
        touched
    }

    /// Remove every entry with the id. Returns the number removed.
    pub fn remove_shape(&mut self, id: ShapeId) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(|s| s.id != id);
        before - self.shapes.len()
    }

    /// Clear all shapes from the document.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Topmost shape with the id.
    pub fn get_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().rev().find(|s| s.id == id)
    }

    pub fn get_shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.iter_mut().rev().find(|s| s.id == id)
    }

    /// Index of the topmost shape with the id.
    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.shapes.iter().rposition(|s| s.id == id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.iter().any(|s| s.id == id)
    }

    /// Move the shape at `index` to the top. Returns its id.
    ///
    /// Selecting a shape promotes it, so the list order changes locally
    /// without any message being sent.
    pub fn promote(&mut self, index: usize) -> Option<ShapeId> {
        if index >= self.shapes.len() {
            return None;
        }
        let shape = self.shapes.remove(index);
        let id = shape.id;
        self.shapes.push(shape);
        Some(id)
    }

    /// Get the bounding box of all shapes.
    pub fn bounds(&self) -> Option<Rect> {
        self.shapes
            .iter()
            .map(|s| s.bounds())
            .reduce(|acc, b| acc.union(b))
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ShapeKind, StyleSettings};
    use kurbo::Point;

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
    fn test_add_shape() {
        let mut doc = CanvasDocument::new();
        assert!(doc.is_empty());
        let shape = rect(0.0);
        let id = shape.id();
        doc.add_shape(shape);
        assert_eq!(doc.len(), 1);
        assert!(doc.get_shape(id).is_some());
    }

    #[test]
    fn test_remove_shape_removes_duplicates() {
        let mut doc = CanvasDocument::new();
        let shape = rect(0.0);
        let id = shape.id();
        doc.add_shape(shape.clone());
        doc.add_shape(rect(20.0));
        doc.add_shape(shape);
        assert_eq!(doc.remove_shape(id), 2);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.remove_shape(id), 0);
    }

    #[test]
    fn test_update_touches_every_duplicate() {
        let mut doc = CanvasDocument::new();
        let shape = rect(0.0);
        doc.add_shape(shape.clone());
        doc.add_shape(shape.clone());
        let mut moved = shape.clone();
        moved.translate(5.0, 5.0);
        assert_eq!(doc.update_shape(&moved), 2);
        assert!(doc.shapes().iter().all(|s| s.x1 == 5.0));

        let stranger = rect(50.0);
        assert_eq!(doc.update_shape(&stranger), 0);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_promote() {
        let mut doc = CanvasDocument::new();
        let a = rect(0.0);
        let b = rect(20.0);
        let c = rect(40.0);
        let a_id = a.id();
        doc.add_shape(a);
        doc.add_shape(b);
        doc.add_shape(c);

        assert_eq!(doc.promote(0), Some(a_id));
        assert_eq!(doc.index_of(a_id), Some(2));
        assert_eq!(doc.promote(3), None);
    }

    #[test]
    fn test_json_is_a_plain_array() {
        let mut doc = CanvasDocument::new();
        doc.add_shape(rect(0.0));
        let json = doc.to_json().unwrap();
        assert!(json.starts_with('['));
        assert_eq!(CanvasDocument::from_json(&json).unwrap(), doc);
    }
}
