//! Eraser hit testing: at most one shape per sampled point.

use crate::canvas::CanvasDocument;
use crate::shapes::{Shape, ShapeId, ShapeKind, point_to_segment_dist};
use kurbo::Point;

/// Lower bound on the brush used against outlines, so thin brushes still
/// catch strokes.
pub const MIN_OUTLINE_BRUSH: f64 = 10.0;

/// Eraser with a given brush diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraserEngine {
    diameter: f64,
}

impl EraserEngine {
    pub fn new(diameter: f64) -> Self {
        Self {
            diameter: diameter.max(0.0),
        }
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Whether the brush at `point` touches `shape`.
    pub fn hits(&self, shape: &Shape, point: Point) -> bool {
        match shape.kind {
            ShapeKind::Freehand => shape
                .nearest_sample_distance(point)
                .is_some_and(|d| d <= self.diameter / 2.0),
            ShapeKind::Text => shape.contains(point),
            _ => shape.outline_distance(point) <= self.diameter.max(MIN_OUTLINE_BRUSH) / 2.0,
        }
    }

    /// Ranking distance among hits; lower wins.
    fn rank(shape: &Shape, point: Point) -> f64 {
        if shape.kind.is_linear() {
            point_to_segment_dist(shape.to_local(point), shape.start(), shape.end())
        } else {
            shape.center().distance(point)
        }
    }

    /// Index of the shape the brush at `point` would erase.
    pub fn pick(&self, shapes: &[Shape], point: Point) -> Option<usize> {
        shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| self.hits(s, point))
            .map(|(i, s)| (i, Self::rank(s, point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Erase the picked shape, with every duplicate of its id.
    pub fn erase_at(&self, canvas: &mut CanvasDocument, point: Point) -> Option<ShapeId> {
        let index = self.pick(canvas.shapes(), point)?;
        let id = canvas.shapes()[index].id();
        canvas.remove_shape(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{PathPoint, StyleSettings};
    use kurbo::Size;

    fn make(kind: ShapeKind, x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::from_drag(
            kind,
            Point::new(x1, y1),
            Point::new(x2, y2),
            &StyleSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rectangle_hit_on_outline_only() {
        let eraser = EraserEngine::new(20.0);
        let rect = make(ShapeKind::Rectangle, 0.0, 0.0, 100.0, 100.0);
        assert!(eraser.hits(&rect, Point::new(100.0, 50.0)));
        assert!(eraser.hits(&rect, Point::new(108.0, 50.0)));
        assert!(!eraser.hits(&rect, Point::new(50.0, 50.0)));
        assert!(!eraser.hits(&rect, Point::new(115.0, 50.0)));
    }

    #[test]
    fn test_small_brush_uses_minimum_outline_width() {
        let eraser = EraserEngine::new(2.0);
        let line = make(ShapeKind::Line, 0.0, 0.0, 100.0, 0.0);
        assert!(eraser.hits(&line, Point::new(50.0, 4.0)));
        assert!(!eraser.hits(&line, Point::new(50.0, 6.0)));
    }

    #[test]
    fn test_freehand_uses_brush_radius() {
        let eraser = EraserEngine::new(10.0);
        let stroke = Shape::freehand(
            vec![PathPoint::new(0.0, 0.0, None), PathPoint::new(100.0, 0.0, None)],
            &StyleSettings::default(),
        );
        assert!(eraser.hits(&stroke, Point::new(3.0, 3.0)));
        // near the segment, but not near a sample
        assert!(!eraser.hits(&stroke, Point::new(50.0, 0.0)));
    }

    #[test]
    fn test_text_uses_bbox() {
        let eraser = EraserEngine::new(10.0);
        let text = Shape::text(
            Point::new(10.0, 10.0),
            "note",
            Size::new(50.0, 20.0),
            &StyleSettings::default(),
        );
        assert!(eraser.hits(&text, Point::new(30.0, 20.0)));
        assert!(!eraser.hits(&text, Point::new(70.0, 20.0)));
    }

    #[test]
    fn test_rotated_outline() {
        let eraser = EraserEngine::new(10.0);
        let mut rect = make(ShapeKind::Rectangle, 0.0, 40.0, 100.0, 60.0);
        rect.set_rotation(90.0);
        assert!(eraser.hits(&rect, Point::new(50.0, 0.0)));
        assert!(!eraser.hits(&rect, Point::new(0.0, 50.0)));
    }

    #[test]
    fn test_closest_hit_wins() {
        let eraser = EraserEngine::new(20.0);
        let far_line = make(ShapeKind::Line, 0.0, 0.0, 100.0, 8.0);
        let near_line = make(ShapeKind::Line, 0.0, 2.0, 100.0, 2.0);
        let near_id = near_line.id();
        let mut canvas = CanvasDocument::from_shapes(vec![near_line, far_line]);

        assert_eq!(eraser.erase_at(&mut canvas, Point::new(50.0, 1.0)), Some(near_id));
        assert_eq!(canvas.len(), 1);
    }

    #[test]
    fn test_erase_nothing() {
        let eraser = EraserEngine::new(20.0);
        let mut canvas =
            CanvasDocument::from_shapes(vec![make(ShapeKind::Ellipse, 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(eraser.erase_at(&mut canvas, Point::new(500.0, 500.0)), None);
        assert_eq!(canvas.len(), 1);
    }
}
