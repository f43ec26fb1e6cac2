//! Pressure-weighted outline for freehand strokes.

use inkroom_core::input::DEFAULT_PRESSURE;
use inkroom_core::shapes::PathPoint;
use kurbo::{BezPath, Circle, Shape as _, Vec2};

/// Outline diameter relative to the stroke width at neutral pressure.
pub const SIZE_FACTOR: f64 = 2.0;
/// Width multiplier at zero pressure.
pub const MIN_PRESSURE_FACTOR: f64 = 0.1;
/// Width multiplier at full pressure.
pub const MAX_PRESSURE_FACTOR: f64 = 2.0;

/// Outline diameter at one sample.
pub fn pressure_width(stroke_width: f64, pressure: Option<f64>) -> f64 {
    let pressure = pressure.unwrap_or(DEFAULT_PRESSURE).clamp(0.0, 1.0);
    let multiplier = MIN_PRESSURE_FACTOR + pressure * (MAX_PRESSURE_FACTOR - MIN_PRESSURE_FACTOR);
    stroke_width * SIZE_FACTOR * multiplier
}

/// Closed polygon around the stroke, wider where pressure was higher.
///
/// One distinct sample yields a dot; no samples yield an empty path.
pub fn freehand_outline(samples: &[PathPoint], stroke_width: f64) -> BezPath {
    let mut points: Vec<&PathPoint> = Vec::with_capacity(samples.len());
    for sample in samples {
        if points.last().is_none_or(|last| last.point() != sample.point()) {
            points.push(sample);
        }
    }

    match points.as_slice() {
        [] => BezPath::new(),
        [only] => {
            let radius = pressure_width(stroke_width, only.pressure) / 2.0;
            Circle::new(only.point(), radius).to_path(0.1)
        }
        _ => {
            let n = points.len();
            let mut left = Vec::with_capacity(n);
            let mut right = Vec::with_capacity(n);
            for i in 0..n {
                let prev = points[i.saturating_sub(1)].point();
                let next = points[(i + 1).min(n - 1)].point();
                let normal = unit_normal(next - prev);
                let radius = pressure_width(stroke_width, points[i].pressure) / 2.0;
                let p = points[i].point();
                left.push(p + normal * radius);
                right.push(p - normal * radius);
            }

            let mut path = BezPath::new();
            path.move_to(left[0]);
            for &p in &left[1..] {
                path.line_to(p);
            }
            for &p in right.iter().rev() {
                path.line_to(p);
            }
            path.close_path();
            path
        }
    }
}

fn unit_normal(direction: Vec2) -> Vec2 {
    let len = direction.hypot();
    if len <= f64::EPSILON {
        Vec2::ZERO
    } else {
        Vec2::new(-direction.y / len, direction.x / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(pressure: f64) -> Vec<PathPoint> {
        vec![
            PathPoint::new(0.0, 0.0, Some(pressure)),
            PathPoint::new(50.0, 0.0, Some(pressure)),
            PathPoint::new(100.0, 0.0, Some(pressure)),
        ]
    }

    #[test]
    fn test_pressure_width_range() {
        assert!((pressure_width(2.0, Some(0.0)) - 0.4).abs() < 1e-9);
        assert!((pressure_width(2.0, Some(1.0)) - 8.0).abs() < 1e-9);
        assert_eq!(pressure_width(2.0, None), pressure_width(2.0, Some(DEFAULT_PRESSURE)));
    }

    #[test]
    fn test_outline_follows_pressure() {
        let heavy = freehand_outline(&stroke(1.0), 2.0).bounding_box();
        let light = freehand_outline(&stroke(0.0), 2.0).bounding_box();
        assert!((heavy.height() - 8.0).abs() < 1e-9);
        assert!((light.height() - 0.4).abs() < 1e-9);
        assert!((heavy.width() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_outline_is_closed_polygon() {
        let path = freehand_outline(&stroke(0.5), 2.0);
        let vertices = path
            .elements()
            .iter()
            .filter(|el| matches!(el, kurbo::PathEl::MoveTo(_) | kurbo::PathEl::LineTo(_)))
            .count();
        assert_eq!(vertices, 6);
        assert!(matches!(path.elements().last(), Some(kurbo::PathEl::ClosePath)));
    }

    #[test]
    fn test_degenerate_strokes() {
        assert!(freehand_outline(&[], 2.0).elements().is_empty());

        let repeated = vec![PathPoint::new(5.0, 5.0, Some(1.0)); 3];
        let dot = freehand_outline(&repeated, 2.0).bounding_box();
        assert!((dot.width() - 8.0).abs() < 1e-6);
        assert!((dot.center().x - 5.0).abs() < 1e-6);
    }
}
