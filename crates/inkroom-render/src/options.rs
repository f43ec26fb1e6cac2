//! Stable drawing options and the hand-drawn path effect.

use inkroom_core::shapes::{FillPattern, ShapeOptions};
use kurbo::{BezPath, PathEl, Point};
use peniko::Color;

/// Options handed to [`Surface::draw_shape`](crate::Surface::draw_shape).
///
/// Built from a shape's [`ShapeOptions`]; identical options and seed always
/// produce the identical sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct RoughOptions {
    /// 0 = clean, 1 = slight wobble, 2 = very sketchy.
    pub roughness: f64,
    pub stroke_width: f64,
    /// Dash pattern; empty for solid strokes.
    pub stroke_line_dash: Vec<f64>,
    pub fill_style: FillPattern,
    pub fill: Option<Color>,
    pub stroke: Color,
    pub seed: u32,
}

impl From<&ShapeOptions> for RoughOptions {
    fn from(options: &ShapeOptions) -> Self {
        let stroke_width = options.stroke_width.width();
        Self {
            roughness: options.roughness.roughness(),
            stroke_width,
            stroke_line_dash: options.stroke_style.line_dash(stroke_width),
            fill_style: options.fill_style,
            fill: options.fill_color(),
            stroke: options.stroke_color(),
            seed: options.seed,
        }
    }
}

/// Seeded xorshift32 generator.
struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Random float in `[-1, 1]`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u32() as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    fn offset(&mut self, amount: f64) -> f64 {
        self.next_f64() * amount
    }

    fn jitter(&mut self, p: Point, amount: f64) -> Point {
        Point::new(p.x + self.offset(amount), p.y + self.offset(amount))
    }
}

/// Apply the hand-drawn effect to `path`.
///
/// Endpoints are offset so lines overshoot at corners, and straight segments
/// bow slightly in the middle. `pass` selects an independent random sequence,
/// so two passes over the same path give the doubled sketch look.
pub fn sketch_path(path: &BezPath, options: &RoughOptions, pass: u32) -> BezPath {
    let roughness = options.roughness;
    if roughness <= 0.0 {
        return path.clone();
    }

    let max_offset = roughness * 2.0;
    let bowing = roughness;
    let mut rng = SimpleRng::new(options.seed.wrapping_add(pass.wrapping_mul(99991)));

    let mut result = BezPath::new();
    let mut last = Point::ZERO;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                result.move_to(rng.jitter(p, max_offset));
                last = p;
            }
            PathEl::LineTo(p) => {
                let d = p - last;
                let len = d.hypot();
                let bow = rng.offset(bowing * roughness * len / 200.0);
                let perp = if len > 0.001 {
                    kurbo::Vec2::new(-d.y / len, d.x / len)
                } else {
                    kurbo::Vec2::ZERO
                };
                let mid = last.midpoint(p) + perp * bow;
                result.quad_to(mid, rng.jitter(p, max_offset));
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                result.quad_to(rng.jitter(p1, max_offset * 0.7), rng.jitter(p2, max_offset));
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                result.curve_to(
                    rng.jitter(p1, max_offset * 0.5),
                    rng.jitter(p2, max_offset * 0.5),
                    rng.jitter(p3, max_offset),
                );
                last = p3;
            }
            PathEl::ClosePath => result.close_path(),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkroom_core::shapes::{Sloppiness, StrokeStyle, StyleSettings};
    use kurbo::Shape as _;

    fn square() -> BezPath {
        kurbo::Rect::new(0.0, 0.0, 100.0, 100.0).to_path(0.1)
    }

    #[test]
    fn test_from_shape_options() {
        let settings = StyleSettings {
            stroke_style: StrokeStyle::Dashed,
            ..StyleSettings::default()
        };
        let options = RoughOptions::from(&settings.options_with_seed(7));
        assert_eq!(options.stroke_width, 2.0);
        assert_eq!(options.stroke_line_dash, vec![10.0, 10.0]);
        assert_eq!(options.seed, 7);
        assert_eq!(options.roughness, 1.0);
    }

    #[test]
    fn test_architect_is_clean() {
        let settings = StyleSettings {
            roughness: Sloppiness::Architect,
            ..StyleSettings::default()
        };
        let options = RoughOptions::from(&settings.options_with_seed(1));
        assert_eq!(sketch_path(&square(), &options, 0), square());
    }

    #[test]
    fn test_sketch_is_deterministic_per_seed() {
        let options = RoughOptions::from(&StyleSettings::default().options_with_seed(42));
        let a = sketch_path(&square(), &options, 0);
        let b = sketch_path(&square(), &options, 0);
        assert_eq!(a, b);
        assert_ne!(a, sketch_path(&square(), &options, 1));

        let other = RoughOptions {
            seed: 43,
            ..options
        };
        assert_ne!(a, sketch_path(&square(), &other, 0));
    }

    #[test]
    fn test_sketch_stays_near_original() {
        let options = RoughOptions::from(&StyleSettings::default().options_with_seed(9));
        let sketched = sketch_path(&square(), &options, 0);
        let bounds = sketched.bounding_box();
        assert!(bounds.x0 > -5.0 && bounds.y0 > -5.0);
        assert!(bounds.x1 < 105.0 && bounds.y1 < 105.0);
    }
}
