//! Tool system: the active tool and shape-creation gestures.

use crate::input::PointerSample;
use crate::shapes::{PathPoint, Shape, ShapeKind, StyleSettings, generate_seed};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Selection,
    Rectangle,
    Diamond,
    Ellipse,
    Line,
    Arrow,
    Freehand,
    Text,
    Eraser,
}

impl ToolKind {
    /// Shape kind created by dragging with this tool.
    pub fn drag_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Diamond => Some(ShapeKind::Diamond),
            ToolKind::Ellipse => Some(ShapeKind::Ellipse),
            ToolKind::Line => Some(ShapeKind::Line),
            ToolKind::Arrow => Some(ShapeKind::Arrow),
            ToolKind::Selection | ToolKind::Freehand | ToolKind::Text | ToolKind::Eraser => None,
        }
    }
}

/// State of a creation gesture.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    /// A drag-drawn shape is being sized.
    Dragging {
        kind: ShapeKind,
        start: Point,
        current: Point,
        /// Seed for hand-drawn effect (generated once at start, stable during drawing).
        seed: u32,
    },
    /// A freehand stroke is collecting samples.
    Stroking { samples: Vec<PathPoint>, seed: u32 },
}

/// Tracks the current tool and the creation gesture in progress.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    pub current_tool: ToolKind,
    pub state: ToolState,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, abandoning any gesture.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Begin a creation gesture. Returns false if the tool does not create
    /// shapes by dragging or stroking.
    pub fn begin(&mut self, sample: PointerSample) -> bool {
        let seed = generate_seed();
        self.state = if let Some(kind) = self.current_tool.drag_kind() {
            ToolState::Dragging {
                kind,
                start: sample.position,
                current: sample.position,
                seed,
            }
        } else if self.current_tool == ToolKind::Freehand {
            ToolState::Stroking {
                samples: vec![to_path_point(sample)],
                seed,
            }
        } else {
            ToolState::Idle
        };
        self.is_active()
    }

    /// Feed a pointer sample to the gesture.
    pub fn update(&mut self, sample: PointerSample) {
        match &mut self.state {
            ToolState::Idle => {}
            ToolState::Dragging { current, .. } => *current = sample.position,
            ToolState::Stroking { samples, .. } => samples.push(to_path_point(sample)),
        }
    }

    /// End the gesture and return the created shape.
    ///
    /// A drag whose end equals its start and a stroke with fewer than two
    /// samples create nothing.
    pub fn end(&mut self, point: Point, settings: &StyleSettings) -> Option<Shape> {
        match std::mem::take(&mut self.state) {
            ToolState::Idle => None,
            ToolState::Dragging {
                kind, start, seed, ..
            } => {
                if start == point {
                    return None;
                }
                Shape::from_drag_with_seed(kind, start, point, settings, seed)
            }
            ToolState::Stroking { samples, seed } => {
                (samples.len() >= 2).then(|| Shape::freehand_with_seed(samples, settings, seed))
            }
        }
    }

    /// Cancel the current interaction.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// Live preview of the gesture; never part of the shape list.
    pub fn preview_shape(&self, settings: &StyleSettings) -> Option<Shape> {
        match &self.state {
            ToolState::Idle => None,
            ToolState::Dragging {
                kind,
                start,
                current,
                seed,
            } => Shape::from_drag_with_seed(*kind, *start, *current, settings, *seed),
            ToolState::Stroking { samples, seed } => (samples.len() >= 2)
                .then(|| Shape::freehand_with_seed(samples.clone(), settings, *seed)),
        }
    }
}

fn to_path_point(sample: PointerSample) -> PathPoint {
    PathPoint::new(sample.position.x, sample.position.y, Some(sample.pressure))
}
