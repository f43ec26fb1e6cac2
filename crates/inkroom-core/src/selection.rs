//! Single-shape selection: hit testing, handles, drag, resize, rotate and
//! marquee mechanics.

use crate::canvas::CanvasDocument;
use crate::shapes::{Shape, ShapeId, ShapeKind};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A freehand stroke is hit within this distance of any of its samples.
pub const FREEHAND_HIT_DISTANCE: f64 = 10.0;
/// Two candidate areas closer than this are a tie, won by the topmost.
pub const AREA_TIE_EPSILON: f64 = 100.0;
/// Resize handle hit tolerance.
pub const RESIZE_HANDLE_TOLERANCE: f64 = 6.0;
/// Rotation handle hit tolerance.
pub const ROTATE_HANDLE_TOLERANCE: f64 = 8.0;
/// Distance from the top edge to the rotation handle.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Smallest extent of either bbox axis after a resize.
pub const MIN_EXTENT: f64 = 10.0;

/// Which of the two stored coordinates of an axis a handle moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

/// The eight resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// Direction of a resize cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorAxis {
    /// West-east.
    Horizontal,
    /// North-south.
    Vertical,
    /// Northwest-southeast.
    Diagonal,
    /// Northeast-southwest.
    AntiDiagonal,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    /// `(x side, y side)` moved by this handle.
    fn sides(self) -> (Option<Side>, Option<Side>) {
        use ResizeHandle::*;
        match self {
            TopLeft => (Some(Side::First), Some(Side::First)),
            Top => (None, Some(Side::First)),
            TopRight => (Some(Side::Second), Some(Side::First)),
            Right => (Some(Side::Second), None),
            BottomRight => (Some(Side::Second), Some(Side::Second)),
            Bottom => (None, Some(Side::Second)),
            BottomLeft => (Some(Side::First), Some(Side::Second)),
            Left => (Some(Side::First), None),
        }
    }

    /// Position in the shape's unrotated frame, from the raw corners.
    pub fn position(self, shape: &Shape) -> Point {
        let pick = |side: Option<Side>, first: f64, second: f64| match side {
            Some(Side::First) => first,
            Some(Side::Second) => second,
            None => (first + second) / 2.0,
        };
        let (xs, ys) = self.sides();
        Point::new(pick(xs, shape.x1, shape.x2), pick(ys, shape.y1, shape.y2))
    }

    pub fn cursor_axis(self) -> CursorAxis {
        use ResizeHandle::*;
        match self {
            Top | Bottom => CursorAxis::Vertical,
            Left | Right => CursorAxis::Horizontal,
            TopLeft | BottomRight => CursorAxis::Diagonal,
            TopRight | BottomLeft => CursorAxis::AntiDiagonal,
        }
    }
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Resize(ResizeHandle),
    Rotate,
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// Pointer feedback for the host's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Move,
    Resize(ResizeHandle),
    Rotate,
}

/// Rotation handle position in the shape's unrotated frame.
fn rotate_handle_local(shape: &Shape) -> Point {
    let b = shape.bounds();
    Point::new(b.center().x, b.y0 - ROTATE_HANDLE_OFFSET)
}

/// Get the selection handles for a shape, in canvas coordinates.
pub fn get_handles(shape: &Shape) -> Vec<Handle> {
    let mut handles = Vec::new();
    if shape.kind.is_resizable() {
        handles.extend(ResizeHandle::ALL.iter().map(|&h| {
            Handle::new(shape.to_world(h.position(shape)), HandleKind::Resize(h))
        }));
    }
    if shape.kind.is_rotatable() {
        handles.push(Handle::new(
            shape.to_world(rotate_handle_local(shape)),
            HandleKind::Rotate,
        ));
    }
    handles
}

/// Selection hit rule for one shape.
pub fn shape_hit(shape: &Shape, point: Point) -> bool {
    match shape.kind {
        ShapeKind::Freehand => shape
            .nearest_sample_distance(point)
            .is_some_and(|d| d <= FREEHAND_HIT_DISTANCE),
        _ => shape.contains(point),
    }
}

/// Pick one index among `(index, area)` candidates.
///
/// The smallest area wins, unless the two smallest are within
/// [`AREA_TIE_EPSILON`] of each other; then the higher index of those two wins.
pub fn pick_winner(candidates: impl IntoIterator<Item = (usize, f64)>) -> Option<usize> {
    let mut candidates: Vec<(usize, f64)> = candidates.into_iter().collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));
    match candidates.as_slice() {
        [] => None,
        [only] => Some(only.0),
        [first, second, ..] => {
            if (second.1 - first.1).abs() <= AREA_TIE_EPSILON {
                Some(first.0.max(second.0))
            } else {
                Some(first.0)
            }
        }
    }
}

/// Rotation in degrees for a pointer around `center`, in `[0, 360)`.
///
/// Zero points straight up.
pub fn rotation_for_pointer(center: Point, pointer: Point) -> f64 {
    let d = pointer - center;
    normalize_degrees(d.y.atan2(d.x).to_degrees() + 90.0)
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Express a canvas-space delta in the shape's unrotated frame.
fn local_delta(shape: &Shape, delta: Vec2) -> Vec2 {
    if !shape.is_rotated() {
        return delta;
    }
    let (sin, cos) = (-shape.rotation_radians()).sin_cos();
    Vec2::new(delta.x * cos - delta.y * sin, delta.x * sin + delta.y * cos)
}

/// Push `moving` away from `fixed` until the extent reaches [`MIN_EXTENT`].
fn clamp_axis(moving: &mut f64, fixed: f64, fallback_dir: f64) {
    let extent = *moving - fixed;
    if extent.abs() >= MIN_EXTENT {
        return;
    }
    let dir = if extent != 0.0 { extent.signum() } else { fallback_dir };
    *moving = fixed + dir * MIN_EXTENT;
}

/// Move the coordinates a handle controls by `delta` (canvas space), then
/// clamp both axes to [`MIN_EXTENT`].
pub fn apply_resize(shape: &mut Shape, handle: ResizeHandle, delta: Vec2) {
    let local = local_delta(shape, delta);
    let (xs, ys) = handle.sides();

    let x_dir = if shape.x2 >= shape.x1 { 1.0 } else { -1.0 };
    let y_dir = if shape.y2 >= shape.y1 { 1.0 } else { -1.0 };

    match xs {
        Some(Side::First) => shape.x1 += local.x,
        Some(Side::Second) => shape.x2 += local.x,
        None => {}
    }
    match ys {
        Some(Side::First) => shape.y1 += local.y,
        Some(Side::Second) => shape.y2 += local.y,
        None => {}
    }

    // An axis the handle does not touch grows through its second coordinate.
    match xs {
        Some(Side::First) => clamp_axis(&mut shape.x1, shape.x2, -x_dir),
        Some(Side::Second) | None => clamp_axis(&mut shape.x2, shape.x1, x_dir),
    }
    match ys {
        Some(Side::First) => clamp_axis(&mut shape.y1, shape.y2, -y_dir),
        Some(Side::Second) | None => clamp_axis(&mut shape.y2, shape.y1, y_dir),
    }
}

/// State of an active manipulation.
#[derive(Debug, Clone)]
enum Operation {
    Drag {
        shape_id: ShapeId,
        last: Point,
        distance: f64,
    },
    Resize {
        shape_id: ShapeId,
        handle: ResizeHandle,
        last: Point,
        changed: bool,
    },
    Rotate {
        shape_id: ShapeId,
        initial: Option<f64>,
    },
    Marquee {
        start: Point,
        current: Point,
    },
}

/// Holds the selected shape id and the manipulation in progress.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: Option<ShapeId>,
    operation: Option<Operation>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    pub fn selected_shape<'a>(&self, canvas: &'a CanvasDocument) -> Option<&'a Shape> {
        self.selected.and_then(|id| canvas.get_shape(id))
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selected == Some(id)
    }

    /// Drop the selection and any manipulation in progress.
    pub fn clear(&mut self) {
        self.selected = None;
        self.operation = None;
    }

    /// Whether a drag, resize, rotate or marquee is in progress.
    pub fn is_active(&self) -> bool {
        self.operation.is_some()
    }

    /// Select the shape at `index`, promoting it to the top.
    pub fn select_index(&mut self, canvas: &mut CanvasDocument, index: usize) -> Option<ShapeId> {
        let id = canvas.promote(index)?;
        self.selected = Some(id);
        Some(id)
    }

    /// Index of the shape a click at `point` would select. No side effects.
    pub fn hit_test(shapes: &[Shape], point: Point) -> Option<usize> {
        pick_winner(
            shapes
                .iter()
                .enumerate()
                .filter(|(_, s)| shape_hit(s, point))
                .map(|(i, s)| (i, s.area())),
        )
    }

    /// Hit-test and select the winner.
    pub fn select_at(&mut self, canvas: &mut CanvasDocument, point: Point) -> Option<ShapeId> {
        let index = Self::hit_test(canvas.shapes(), point)?;
        self.select_index(canvas, index)
    }

    /// Topmost text shape containing `point`.
    pub fn text_at(shapes: &[Shape], point: Point) -> Option<usize> {
        shapes
            .iter()
            .rposition(|s| s.kind == ShapeKind::Text && s.contains(point))
    }

    /// Whether `point` is on the selected shape's rotation handle.
    pub fn rotate_handle_hit(&self, canvas: &CanvasDocument, point: Point) -> bool {
        self.selected_shape(canvas)
            .filter(|s| s.kind.is_rotatable())
            .is_some_and(|s| {
                s.to_local(point).distance(rotate_handle_local(s)) <= ROTATE_HANDLE_TOLERANCE
            })
    }

    /// Resize handle of the selected shape under `point`.
    pub fn resize_handle_at(&self, canvas: &CanvasDocument, point: Point) -> Option<ResizeHandle> {
        let shape = self.selected_shape(canvas)?;
        if !shape.kind.is_resizable() {
            return None;
        }
        let local = shape.to_local(point);
        ResizeHandle::ALL
            .into_iter()
            .find(|h| h.position(shape).distance(local) <= RESIZE_HANDLE_TOLERANCE)
    }

    /// Start moving the selected shape.
    pub fn begin_drag(&mut self, point: Point) {
        if let Some(shape_id) = self.selected {
            self.operation = Some(Operation::Drag {
                shape_id,
                last: point,
                distance: 0.0,
            });
        }
    }

    pub fn begin_resize(&mut self, handle: ResizeHandle, point: Point) {
        if let Some(shape_id) = self.selected {
            self.operation = Some(Operation::Resize {
                shape_id,
                handle,
                last: point,
                changed: false,
            });
        }
    }

    pub fn begin_rotate(&mut self, canvas: &CanvasDocument) {
        if let Some(shape) = self.selected_shape(canvas) {
            self.operation = Some(Operation::Rotate {
                shape_id: shape.id(),
                initial: shape.rotation,
            });
        }
    }

    /// Start a marquee; clears the selection.
    pub fn begin_marquee(&mut self, point: Point) {
        self.selected = None;
        self.operation = Some(Operation::Marquee {
            start: point,
            current: point,
        });
    }

    /// Current marquee rectangle, normalized.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self.operation {
            Some(Operation::Marquee { start, current }) => Some(Rect::from_points(start, current)),
            _ => None,
        }
    }

    /// Feed a pointer sample to the operation in progress.
    /// Returns true if the canvas or marquee changed.
    pub fn update(&mut self, canvas: &mut CanvasDocument, point: Point) -> bool {
        let Some(operation) = &mut self.operation else {
            return false;
        };
        match operation {
            Operation::Drag {
                shape_id,
                last,
                distance,
            } => {
                let delta = point - *last;
                *last = point;
                let Some(shape) = canvas.get_shape_mut(*shape_id) else {
                    return false;
                };
                shape.translate(delta.x, delta.y);
                *distance += delta.hypot();
                delta != Vec2::ZERO
            }
            Operation::Resize {
                shape_id,
                handle,
                last,
                changed,
            } => {
                let delta = point - *last;
                *last = point;
                let Some(shape) = canvas.get_shape_mut(*shape_id) else {
                    return false;
                };
                let before = (shape.x1, shape.y1, shape.x2, shape.y2);
                apply_resize(shape, *handle, delta);
                let moved = before != (shape.x1, shape.y1, shape.x2, shape.y2);
                *changed |= moved;
                moved
            }
            Operation::Rotate { shape_id, .. } => {
                let Some(shape) = canvas.get_shape_mut(*shape_id) else {
                    return false;
                };
                let before = shape.rotation;
                shape.set_rotation(rotation_for_pointer(shape.center(), point));
                before != shape.rotation
            }
            Operation::Marquee { current, .. } => {
                let moved = *current != point;
                *current = point;
                moved
            }
        }
    }

    /// End the operation in progress.
    ///
    /// Returns the manipulated shape when it changed and should be broadcast.
    /// A marquee resolves to at most one selection here.
    pub fn finish(&mut self, canvas: &mut CanvasDocument) -> Option<Shape> {
        let changed_id = match self.operation.take()? {
            Operation::Drag {
                shape_id, distance, ..
            } => (distance > 0.0).then_some(shape_id),
            Operation::Resize {
                shape_id, changed, ..
            } => changed.then_some(shape_id),
            Operation::Rotate { shape_id, initial } => canvas
                .get_shape(shape_id)
                .is_some_and(|s| s.rotation != initial)
                .then_some(shape_id),
            Operation::Marquee { start, current } => {
                self.resolve_marquee(canvas, start, current);
                None
            }
        };
        changed_id.and_then(|id| canvas.get_shape(id).cloned())
    }

    fn resolve_marquee(&mut self, canvas: &mut CanvasDocument, start: Point, current: Point) {
        // A marquee that never moved is a plain click on empty space.
        if start == current {
            return;
        }
        let rect = Rect::from_points(start, current);
        let winner = pick_winner(
            canvas
                .shapes()
                .iter()
                .enumerate()
                .filter(|(_, s)| rects_overlap(s.bounds(), rect))
                .map(|(i, s)| (i, s.area())),
        );
        if let Some(index) = winner {
            self.select_index(canvas, index);
        }
    }

    /// Cursor feedback for `point`. No side effects.
    pub fn cursor_at(&self, canvas: &CanvasDocument, point: Point) -> CursorHint {
        match self.operation {
            Some(Operation::Drag { .. }) => return CursorHint::Move,
            Some(Operation::Resize { handle, .. }) => return CursorHint::Resize(handle),
            Some(Operation::Rotate { .. }) => return CursorHint::Rotate,
            Some(Operation::Marquee { .. }) => return CursorHint::Default,
            None => {}
        }
        if self.rotate_handle_hit(canvas, point) {
            CursorHint::Rotate
        } else if let Some(handle) = self.resize_handle_at(canvas, point) {
            CursorHint::Resize(handle)
        } else if Self::text_at(canvas.shapes(), point).is_some()
            || Self::hit_test(canvas.shapes(), point).is_some()
        {
            CursorHint::Move
        } else {
            CursorHint::Default
        }
    }
}

/// Inclusive overlap of two normalized rectangles.
fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}
