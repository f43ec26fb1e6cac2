//! Shape definitions for the shared canvas.
//!
//! A [`Shape`] is a flat record: a kind tag, two bounding corners, an
//! optional rotation and the kind-specific payload (freehand samples or text).
//! The same record is what travels on the wire.

mod outline;
mod style;
mod text;

pub use outline::{
    ARROWHEAD_ANGLE, ARROWHEAD_LENGTH, ELLIPSE_SEGMENTS, arrowhead, point_to_segment_dist,
};
pub use style::{
    FillPattern, SerializableColor, ShapeOptions, Sloppiness, StrokeStyle, StrokeWidth,
    StyleSettings, generate_seed,
};
pub use text::{ApproxTextMeasure, TextMeasure};

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// The closed set of shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Diamond,
    Ellipse,
    Line,
    Arrow,
    Freehand,
    Text,
}

impl ShapeKind {
    /// Kinds whose geometry is fully described by a drag from corner to corner.
    pub fn is_drag_drawn(self) -> bool {
        matches!(
            self,
            ShapeKind::Rectangle
                | ShapeKind::Diamond
                | ShapeKind::Ellipse
                | ShapeKind::Line
                | ShapeKind::Arrow
        )
    }

    pub fn is_resizable(self) -> bool {
        !matches!(self, ShapeKind::Freehand | ShapeKind::Text)
    }

    pub fn is_rotatable(self) -> bool {
        self != ShapeKind::Text
    }

    /// Line-like kinds keep their start at `(x1, y1)` and end at `(x2, y2)`.
    pub fn is_linear(self) -> bool {
        matches!(self, ShapeKind::Line | ShapeKind::Arrow)
    }
}

/// One sample of a freehand stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl PathPoint {
    pub fn new(x: f64, y: f64, pressure: Option<f64>) -> Self {
        Self { x, y, pressure }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<Point> for PathPoint {
    fn from(point: Point) -> Self {
        Self::new(point.x, point.y, None)
    }
}

/// Errors produced while decoding or validating a shape.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("malformed shape JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0:?} shape requires path samples")]
    MissingPath(ShapeKind),
    #[error("{0:?} shape cannot carry path samples")]
    UnexpectedPath(ShapeKind),
    #[error("{0:?} shape requires text")]
    MissingText(ShapeKind),
    #[error("{0:?} shape cannot carry text")]
    UnexpectedText(ShapeKind),
    #[error("shape coordinates must be finite")]
    NonFinite,
}

/// A drawable vector object with identity, geometry and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ShapeRecord")]
pub struct Shape {
    pub(crate) id: ShapeId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// Degrees in `[0, 360)` about the bbox center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<PathPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub options: ShapeOptions,
}

/// Unvalidated wire form of [`Shape`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeRecord {
    id: ShapeId,
    #[serde(rename = "type")]
    kind: ShapeKind,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    #[serde(default)]
    rotation: Option<f64>,
    #[serde(default)]
    paths: Option<Vec<PathPoint>>,
    #[serde(default)]
    text: Option<String>,
    options: ShapeOptions,
}

impl TryFrom<ShapeRecord> for Shape {
    type Error = ShapeError;

    fn try_from(record: ShapeRecord) -> Result<Self, Self::Error> {
        let shape = Shape {
            id: record.id,
            kind: record.kind,
            x1: record.x1,
            y1: record.y1,
            x2: record.x2,
            y2: record.y2,
            rotation: record.rotation,
            paths: record.paths,
            text: record.text,
            options: record.options,
        };
        shape.validate()?;
        Ok(shape)
    }
}

impl Shape {
    fn with_geometry(kind: ShapeKind, start: Point, end: Point, options: ShapeOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            rotation: None,
            paths: None,
            text: None,
            options,
        }
    }

    /// Create a drag-drawn shape spanning `start` to `end`.
    ///
    /// Returns `None` for kinds that are not drawn by dragging.
    pub fn from_drag(
        kind: ShapeKind,
        start: Point,
        end: Point,
        settings: &StyleSettings,
    ) -> Option<Self> {
        Self::from_drag_with_seed(kind, start, end, settings, generate_seed())
    }

    pub(crate) fn from_drag_with_seed(
        kind: ShapeKind,
        start: Point,
        end: Point,
        settings: &StyleSettings,
        seed: u32,
    ) -> Option<Self> {
        kind.is_drag_drawn()
            .then(|| Self::with_geometry(kind, start, end, settings.options_with_seed(seed)))
    }

    /// Create a freehand stroke. Its bbox is the bbox of the samples.
    pub fn freehand(samples: Vec<PathPoint>, settings: &StyleSettings) -> Self {
        Self::freehand_with_seed(samples, settings, generate_seed())
    }

    pub(crate) fn freehand_with_seed(
        samples: Vec<PathPoint>,
        settings: &StyleSettings,
        seed: u32,
    ) -> Self {
        let bounds = samples_bounds(&samples);
        let mut shape = Self::with_geometry(
            ShapeKind::Freehand,
            Point::new(bounds.x0, bounds.y0),
            Point::new(bounds.x1, bounds.y1),
            settings.options_with_seed(seed),
        );
        shape.paths = Some(samples);
        shape
    }

    /// Create a text shape at `origin` with a measured `size`.
    pub fn text(origin: Point, text: impl Into<String>, size: Size, settings: &StyleSettings) -> Self {
        let mut shape = Self::with_geometry(
            ShapeKind::Text,
            origin,
            origin + Vec2::new(size.width, size.height),
            settings.options(),
        );
        shape.text = Some(text.into());
        shape
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Serialize to the wire JSON form.
    pub fn encode(&self) -> Result<String, ShapeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate the wire JSON form.
    pub fn decode(json: &str) -> Result<Self, ShapeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that the payload matches the kind.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let coords = [self.x1, self.y1, self.x2, self.y2, self.rotation.unwrap_or(0.0)];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ShapeError::NonFinite);
        }
        match (self.kind, self.paths.is_some(), self.text.is_some()) {
            (ShapeKind::Freehand, false, _) => Err(ShapeError::MissingPath(self.kind)),
            (ShapeKind::Text, _, false) => Err(ShapeError::MissingText(self.kind)),
            (ShapeKind::Freehand, _, true) => Err(ShapeError::UnexpectedText(self.kind)),
            (ShapeKind::Text, true, _) => Err(ShapeError::UnexpectedPath(self.kind)),
            (kind, true, _) if kind != ShapeKind::Freehand => Err(ShapeError::UnexpectedPath(kind)),
            (kind, _, true) if kind != ShapeKind::Text => Err(ShapeError::UnexpectedText(kind)),
            _ => Ok(()),
        }
    }

    /// Start point for lines and arrows; first corner otherwise.
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// End point for lines and arrows; second corner otherwise.
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Normalized bounding box.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.x1.max(self.x2),
            self.y1.max(self.y2),
        )
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    pub fn area(&self) -> f64 {
        self.bounds().area()
    }

    /// Rotation in radians, 0 when absent.
    pub fn rotation_radians(&self) -> f64 {
        self.rotation.unwrap_or(0.0).to_radians()
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation.is_some_and(|r| r != 0.0)
    }

    /// Transform from the shape's unrotated frame to canvas coordinates.
    pub fn transform(&self) -> Affine {
        if !self.is_rotated() {
            return Affine::IDENTITY;
        }
        let center = self.center().to_vec2();
        Affine::translate(center) * Affine::rotate(self.rotation_radians()) * Affine::translate(-center)
    }

    /// Map a canvas point into the shape's unrotated frame.
    pub fn to_local(&self, point: Point) -> Point {
        if !self.is_rotated() {
            return point;
        }
        self.transform().inverse() * point
    }

    /// Map a point in the shape's unrotated frame back to canvas coordinates.
    pub fn to_world(&self, point: Point) -> Point {
        self.transform() * point
    }

    /// Whether the point lies in the bbox (edges included), rotation-aware.
    pub fn contains(&self, point: Point) -> bool {
        let local = self.to_local(point);
        let b = self.bounds();
        local.x >= b.x0 && local.x <= b.x1 && local.y >= b.y0 && local.y <= b.y1
    }

    /// Freehand samples, empty for other kinds.
    pub fn samples(&self) -> &[PathPoint] {
        self.paths.as_deref().unwrap_or(&[])
    }

    /// Distance from `point` to the nearest freehand sample.
    pub fn nearest_sample_distance(&self, point: Point) -> Option<f64> {
        let local = self.to_local(point);
        self.samples()
            .iter()
            .map(|s| s.point().distance(local))
            .reduce(f64::min)
    }

    /// Move the bbox and every path sample.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x1 += dx;
        self.y1 += dy;
        self.x2 += dx;
        self.y2 += dy;
        if let Some(paths) = &mut self.paths {
            for sample in paths {
                sample.x += dx;
                sample.y += dy;
            }
        }
    }

    /// Set the rotation in degrees; 0 clears it.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = (degrees != 0.0).then_some(degrees);
    }

    /// Copy the current style settings into this shape, keeping its seed.
    pub fn restyle(&mut self, settings: &StyleSettings) {
        self.options = settings.options_with_seed(self.options.seed);
    }

    /// Shallow-merge an incoming snapshot of the same shape.
    ///
    /// Geometry always comes from `incoming`; an absent rotation means
    /// upright. An absent path or text payload keeps its current value.
    pub fn merge(&mut self, incoming: &Shape) {
        self.kind = incoming.kind;
        self.x1 = incoming.x1;
        self.y1 = incoming.y1;
        self.x2 = incoming.x2;
        self.y2 = incoming.y2;
        self.rotation = incoming.rotation;
        if incoming.paths.is_some() {
            self.paths = incoming.paths.clone();
        }
        if incoming.text.is_some() {
            self.text = incoming.text.clone();
        }
        self.options = incoming.options.clone();
    }
}

/// Bounding box of a set of samples; zero-sized at the origin when empty.
pub fn samples_bounds(samples: &[PathPoint]) -> Rect {
    let mut iter = samples.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(first.point(), first.point()), |rect, s| {
        rect.union_pt(s.point())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> StyleSettings {
        StyleSettings::default()
    }

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::from_drag(
            ShapeKind::Rectangle,
            Point::new(x1, y1),
            Point::new(x2, y2),
            &settings(),
        )
        .unwrap()
    }

    #[test]
    fn test_drag_rectangle_keeps_corners() {
        let shape = rect(10.0, 10.0, 100.0, 100.0);
        assert_eq!(shape.kind, ShapeKind::Rectangle);
        assert_eq!((shape.x1, shape.y1, shape.x2, shape.y2), (10.0, 10.0, 100.0, 100.0));
        assert_eq!(shape.rotation, None);
        assert!(shape.paths.is_none());
        assert!(shape.text.is_none());
    }

    #[test]
    fn test_from_drag_rejects_payload_kinds() {
        let s = settings();
        assert!(Shape::from_drag(ShapeKind::Freehand, Point::ZERO, Point::new(1.0, 1.0), &s).is_none());
        assert!(Shape::from_drag(ShapeKind::Text, Point::ZERO, Point::new(1.0, 1.0), &s).is_none());
    }

    #[test]
    fn test_bounds_are_normalized() {
        let shape = rect(100.0, 80.0, 10.0, 20.0);
        let b = shape.bounds();
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (10.0, 20.0, 100.0, 80.0));
        assert_eq!(shape.area(), 90.0 * 60.0);
        assert_eq!(shape.center(), Point::new(55.0, 50.0));
    }

    #[test]
    fn test_constructors_get_unique_ids() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(0.0, 0.0, 10.0, 10.0);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.options.seed, b.options.seed);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut shape = rect(10.5, 20.25, 100.0, 64.0);
        shape.set_rotation(33.3);
        shape.options.fill = Some(SerializableColor::new(12, 34, 56, 200));
        let json = shape.encode().unwrap();
        assert_eq!(Shape::decode(&json).unwrap(), shape);

        let stroke = Shape::freehand(
            vec![
                PathPoint::new(1.0, 2.0, Some(0.5)),
                PathPoint::new(3.0, 5.0, None),
            ],
            &settings(),
        );
        let json = stroke.encode().unwrap();
        assert_eq!(Shape::decode(&json).unwrap(), stroke);

        let text = Shape::text(Point::new(5.0, 5.0), "hello", Size::new(40.0, 20.0), &settings());
        let json = text.encode().unwrap();
        assert_eq!(Shape::decode(&json).unwrap(), text);
    }

    #[test]
    fn test_wire_field_names() {
        let shape = rect(0.0, 0.0, 10.0, 10.0);
        let value: serde_json::Value = serde_json::from_str(&shape.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "rectangle");
        assert_eq!(value["options"]["fill"], "transparent");
        assert_eq!(value["options"]["fillStyle"], "hachure");
        assert!(value.get("rotation").is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let shape = rect(0.0, 0.0, 10.0, 10.0);
        let json = shape.encode().unwrap().replace("\"rectangle\"", "\"hexagon\"");
        assert!(matches!(Shape::decode(&json), Err(ShapeError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_inconsistent_payload() {
        let mut value = serde_json::to_value(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        value["text"] = "oops".into();
        assert!(Shape::decode(&value.to_string()).is_err());

        let mut value = serde_json::to_value(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        value["type"] = "freehand".into();
        assert!(Shape::decode(&value.to_string()).is_err());

        let mut value = serde_json::to_value(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        value["type"] = "text".into();
        assert!(Shape::decode(&value.to_string()).is_err());
    }

    #[test]
    fn test_freehand_bounds_from_samples() {
        let stroke = Shape::freehand(
            vec![
                PathPoint::new(10.0, 40.0, None),
                PathPoint::new(30.0, 5.0, None),
                PathPoint::new(20.0, 25.0, None),
            ],
            &settings(),
        );
        assert_eq!((stroke.x1, stroke.y1, stroke.x2, stroke.y2), (10.0, 5.0, 30.0, 40.0));
    }

    #[test]
    fn test_translate_moves_samples() {
        let mut stroke = Shape::freehand(
            vec![PathPoint::new(0.0, 0.0, None), PathPoint::new(10.0, 10.0, None)],
            &settings(),
        );
        stroke.translate(5.0, -5.0);
        assert_eq!((stroke.x1, stroke.y1, stroke.x2, stroke.y2), (5.0, -5.0, 15.0, 5.0));
        assert_eq!(stroke.samples()[1].point(), Point::new(15.0, 5.0));
    }

    #[test]
    fn test_contains_is_rotation_aware() {
        let mut shape = rect(0.0, 40.0, 100.0, 60.0);
        assert!(shape.contains(Point::new(90.0, 50.0)));
        assert!(!shape.contains(Point::new(50.0, 10.0)));
        assert!(shape.contains(Point::new(100.0, 60.0)));

        shape.set_rotation(90.0);
        assert!(!shape.contains(Point::new(90.0, 50.0)));
        assert!(shape.contains(Point::new(50.0, 10.0)));
    }

    #[test]
    fn test_restyle_keeps_seed() {
        let mut shape = rect(0.0, 0.0, 10.0, 10.0);
        let seed = shape.options.seed;
        let style = StyleSettings {
            stroke_style: StrokeStyle::Dashed,
            fill: Some(SerializableColor::white()),
            ..StyleSettings::default()
        };
        shape.restyle(&style);
        assert_eq!(shape.options.seed, seed);
        assert_eq!(shape.options.stroke_style, StrokeStyle::Dashed);
        assert_eq!(shape.options.fill, Some(SerializableColor::white()));
    }

    #[test]
    fn test_merge_takes_incoming_rotation() {
        let mut local = rect(0.0, 0.0, 10.0, 10.0);
        local.set_rotation(45.0);
        let mut incoming = local.clone();
        incoming.set_rotation(0.0);
        incoming.x2 = 50.0;
        local.merge(&incoming);
        assert_eq!(local.x2, 50.0);
        assert_eq!(local.rotation, None);

        incoming.set_rotation(270.0);
        local.merge(&incoming);
        assert_eq!(local.rotation, Some(270.0));
    }
}
