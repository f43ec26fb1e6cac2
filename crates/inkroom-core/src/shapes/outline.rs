//! Path synthesis and outline geometry.

use super::{Shape, ShapeKind};
use kurbo::{BezPath, Point, Rect, Shape as _, Vec2};
use std::f64::consts::{PI, TAU};

/// Length of each arrowhead stroke.
pub const ARROWHEAD_LENGTH: f64 = 15.0;
/// Angle between the shaft and each arrowhead stroke.
pub const ARROWHEAD_ANGLE: f64 = PI / 6.0;
/// Number of segments approximating an ellipse outline.
pub const ELLIPSE_SEGMENTS: usize = 64;

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// The two arrowhead tips for a shaft from `start` to `end`.
pub fn arrowhead(start: Point, end: Point) -> (Point, Point) {
    let dir = end - start;
    let angle = if dir.hypot2() < f64::EPSILON {
        0.0
    } else {
        dir.atan2()
    };
    let back = angle + PI;
    let tip = |offset: f64| end + Vec2::from_angle(back + offset) * ARROWHEAD_LENGTH;
    (tip(ARROWHEAD_ANGLE), tip(-ARROWHEAD_ANGLE))
}

fn diamond_points(b: Rect) -> [Point; 4] {
    let c = b.center();
    [
        Point::new(c.x, b.y0),
        Point::new(b.x1, c.y),
        Point::new(c.x, b.y1),
        Point::new(b.x0, c.y),
    ]
}

fn rect_points(b: Rect) -> [Point; 4] {
    [
        Point::new(b.x0, b.y0),
        Point::new(b.x1, b.y0),
        Point::new(b.x1, b.y1),
        Point::new(b.x0, b.y1),
    ]
}

fn closed_segments(points: &[Point]) -> Vec<(Point, Point)> {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| (*a, *b))
        .collect()
}

fn ellipse_points(b: Rect) -> Vec<Point> {
    let c = b.center();
    let (rx, ry) = (b.width() / 2.0, b.height() / 2.0);
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
            Point::new(c.x + rx * t.cos(), c.y + ry * t.sin())
        })
        .collect()
}

impl Shape {
    /// Path in the shape's unrotated frame, for rendering.
    ///
    /// Text has no vector path and yields an empty path.
    pub fn to_path(&self) -> BezPath {
        let b = self.bounds();
        match self.kind {
            ShapeKind::Rectangle => b.to_path(0.1),
            ShapeKind::Diamond => {
                let mut path = BezPath::new();
                let [top, right, bottom, left] = diamond_points(b);
                path.move_to(top);
                path.line_to(right);
                path.line_to(bottom);
                path.line_to(left);
                path.close_path();
                path
            }
            ShapeKind::Ellipse => kurbo::Ellipse::from_rect(b).to_path(0.1),
            ShapeKind::Line => {
                let mut path = BezPath::new();
                path.move_to(self.start());
                path.line_to(self.end());
                path
            }
            ShapeKind::Arrow => {
                let mut path = BezPath::new();
                let (left, right) = arrowhead(self.start(), self.end());
                path.move_to(self.start());
                path.line_to(self.end());
                path.move_to(left);
                path.line_to(self.end());
                path.line_to(right);
                path
            }
            ShapeKind::Freehand => {
                let mut path = BezPath::new();
                let mut samples = self.samples().iter();
                if let Some(first) = samples.next() {
                    path.move_to(first.point());
                    for sample in samples {
                        path.line_to(sample.point());
                    }
                }
                path
            }
            ShapeKind::Text => BezPath::new(),
        }
    }

    /// Outline as straight segments in the shape's unrotated frame.
    pub fn outline(&self) -> Vec<(Point, Point)> {
        let b = self.bounds();
        match self.kind {
            ShapeKind::Rectangle | ShapeKind::Text => closed_segments(&rect_points(b)),
            ShapeKind::Diamond => closed_segments(&diamond_points(b)),
            ShapeKind::Ellipse => closed_segments(&ellipse_points(b)),
            ShapeKind::Line => vec![(self.start(), self.end())],
            ShapeKind::Arrow => {
                let (left, right) = arrowhead(self.start(), self.end());
                vec![
                    (self.start(), self.end()),
                    (self.end(), left),
                    (self.end(), right),
                ]
            }
            ShapeKind::Freehand => self
                .samples()
                .windows(2)
                .map(|w| (w[0].point(), w[1].point()))
                .collect(),
        }
    }

    /// Distance from a canvas point to the outline, rotation-aware.
    pub fn outline_distance(&self, point: Point) -> f64 {
        let local = self.to_local(point);
        self.outline()
            .into_iter()
            .map(|(a, b)| point_to_segment_dist(local, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::StyleSettings;

    fn make(kind: ShapeKind, start: Point, end: Point) -> Shape {
        Shape::from_drag(kind, start, end, &StyleSettings::default()).unwrap()
    }

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(14.0, 3.0), a, b) - 5.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_outline_segment_counts() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(100.0, 50.0);
        assert_eq!(make(ShapeKind::Rectangle, start, end).outline().len(), 4);
        assert_eq!(make(ShapeKind::Diamond, start, end).outline().len(), 4);
        assert_eq!(
            make(ShapeKind::Ellipse, start, end).outline().len(),
            ELLIPSE_SEGMENTS
        );
        assert_eq!(make(ShapeKind::Line, start, end).outline().len(), 1);
        assert_eq!(make(ShapeKind::Arrow, start, end).outline().len(), 3);
    }

    #[test]
    fn test_arrowhead_geometry() {
        let (left, right) = arrowhead(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let end = Point::new(100.0, 0.0);
        assert!((left.distance(end) - ARROWHEAD_LENGTH).abs() < 1e-9);
        assert!((right.distance(end) - ARROWHEAD_LENGTH).abs() < 1e-9);
        assert!(left.x < 100.0 && right.x < 100.0);
        assert!((left.y + right.y).abs() < 1e-9);
        let expected_x = 100.0 - ARROWHEAD_LENGTH * (PI / 6.0).cos();
        assert!((left.x - expected_x).abs() < 1e-9);
    }

    #[test]
    fn test_line_keeps_direction() {
        let line = make(ShapeKind::Line, Point::new(50.0, 50.0), Point::new(0.0, 0.0));
        assert_eq!(line.outline()[0], (Point::new(50.0, 50.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_diamond_outline_misses_corners() {
        let diamond = make(ShapeKind::Diamond, Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert!(diamond.outline_distance(Point::new(50.0, 0.0)) < 1e-9);
        assert!(diamond.outline_distance(Point::new(0.0, 0.0)) > 30.0);
    }

    #[test]
    fn test_paths_are_nonempty() {
        let ellipse = make(ShapeKind::Ellipse, Point::new(0.0, 0.0), Point::new(100.0, 50.0));
        assert!(ellipse.to_path().elements().len() > 2);
        let arrow = make(ShapeKind::Arrow, Point::new(0.0, 0.0), Point::new(100.0, 50.0));
        assert_eq!(arrow.to_path().elements().len(), 5);
    }
}
