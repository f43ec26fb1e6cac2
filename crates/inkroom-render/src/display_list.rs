//! Recording surface for headless use and tests.

use crate::options::{RoughOptions, sketch_path};
use crate::renderer::Surface;
use kurbo::{Affine, BezPath, Rect};
use peniko::Color;

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    /// A stroked shape. `strokes` holds the two hand-drawn passes over `path`.
    Shape {
        path: BezPath,
        strokes: [BezPath; 2],
        options: RoughOptions,
        transform: Affine,
    },
    Fill {
        path: BezPath,
        color: Color,
        transform: Affine,
    },
    Text {
        text: String,
        bounds: Rect,
        color: Color,
        transform: Affine,
    },
    Overlay {
        path: BezPath,
        color: Color,
        dashed: bool,
        transform: Affine,
    },
}

/// A [`Surface`] that records every call of the last frame.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of shape-level calls (shapes, freehand fills and text).
    pub fn shape_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    DrawCommand::Shape { .. } | DrawCommand::Fill { .. } | DrawCommand::Text { .. }
                )
            })
            .count()
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, background: Color) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(background));
    }

    fn draw_shape(&mut self, path: &BezPath, options: &RoughOptions, transform: Affine) {
        self.commands.push(DrawCommand::Shape {
            path: path.clone(),
            strokes: [sketch_path(path, options, 0), sketch_path(path, options, 1)],
            options: options.clone(),
            transform,
        });
    }

    fn fill_path(&mut self, path: &BezPath, color: Color, transform: Affine) {
        self.commands.push(DrawCommand::Fill {
            path: path.clone(),
            color,
            transform,
        });
    }

    fn draw_text(&mut self, text: &str, bounds: Rect, color: Color, transform: Affine) {
        self.commands.push(DrawCommand::Text {
            text: text.to_owned(),
            bounds,
            color,
            transform,
        });
    }

    fn stroke_overlay(&mut self, path: &BezPath, color: Color, dashed: bool, transform: Affine) {
        self.commands.push(DrawCommand::Overlay {
            path: path.clone(),
            color,
            dashed,
            transform,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{RenderContext, RenderStyle, redraw, render};
    use inkroom_core::controller::InteractionController;
    use inkroom_core::input::{Key, PointerSample};
    use inkroom_core::shapes::{PathPoint, Shape, ShapeKind, StyleSettings};
    use inkroom_core::sync::{Outbox, SyncClient};
    use inkroom_core::tools::ToolKind;
    use kurbo::{Point, Size};

    fn controller(shapes: Vec<Shape>) -> InteractionController<Outbox> {
        InteractionController::new(
            SyncClient::new("room", Outbox::new()),
            shapes,
            StyleSettings::default(),
        )
    }

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::from_drag(
            ShapeKind::Rectangle,
            Point::new(x1, y1),
            Point::new(x2, y2),
            &StyleSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_shapes_in_list_order() {
        let settings = StyleSettings::default();
        let stroke = Shape::freehand(
            vec![PathPoint::new(0.0, 0.0, Some(0.5)), PathPoint::new(9.0, 9.0, Some(0.5))],
            &settings,
        );
        let text = Shape::text(Point::new(5.0, 5.0), "hi", Size::new(20.0, 24.0), &settings);
        let c = controller(vec![rect(0.0, 0.0, 10.0, 10.0), stroke, text]);

        let mut list = DisplayList::new();
        render(&RenderContext::new(c.render_context()), &mut list);
        let commands = list.commands();

        assert!(matches!(commands[0], DrawCommand::Clear(_)));
        assert!(matches!(commands[1], DrawCommand::Shape { .. }));
        assert!(matches!(commands[2], DrawCommand::Fill { .. }));
        assert!(matches!(&commands[3], DrawCommand::Text { text, .. } if text == "hi"));
        assert_eq!(list.shape_count(), 3);
    }

    #[test]
    fn test_rotation_transform_about_center() {
        let mut shape = rect(0.0, 0.0, 100.0, 50.0);
        shape.set_rotation(90.0);
        let mut list = DisplayList::new();
        let c = controller(vec![shape]);
        render(&RenderContext::new(c.render_context()), &mut list);

        let DrawCommand::Shape { transform, .. } = &list.commands()[1] else {
            panic!("expected a shape command");
        };
        let center = *transform * Point::new(50.0, 25.0);
        assert!((center - Point::new(50.0, 25.0)).hypot() < 1e-9);
        let corner = *transform * Point::new(0.0, 0.0);
        assert!((corner - Point::new(75.0, -25.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_sketch_is_stable_across_redraws() {
        let c = controller(vec![rect(0.0, 0.0, 100.0, 50.0)]);
        let mut first = DisplayList::new();
        let mut second = DisplayList::new();
        render(&RenderContext::new(c.render_context()), &mut first);
        render(&RenderContext::new(c.render_context()), &mut second);
        assert_eq!(first.commands(), second.commands());

        let DrawCommand::Shape { path, strokes, .. } = &first.commands()[1] else {
            panic!("expected a shape command");
        };
        assert_ne!(&strokes[0], path);
        assert_ne!(strokes[0], strokes[1]);
    }

    #[test]
    fn test_selection_chrome_and_marquee() {
        let mut c = controller(vec![rect(10.0, 10.0, 100.0, 100.0)]);
        c.pointer_down(PointerSample::at(50.0, 50.0));
        c.pointer_up(PointerSample::at(50.0, 50.0));

        let mut list = DisplayList::new();
        render(&RenderContext::new(c.render_context()), &mut list);
        let overlays = list
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Overlay { .. }))
            .count();
        // outline, eight resize handles, one rotate handle
        assert_eq!(overlays, 10);

        c.pointer_down(PointerSample::at(300.0, 300.0));
        c.pointer_move(PointerSample::at(320.0, 330.0));
        render(&RenderContext::new(c.render_context()), &mut list);
        assert!(matches!(
            list.commands().last(),
            Some(DrawCommand::Overlay { dashed: true, .. })
        ));
    }

    #[test]
    fn test_preview_is_drawn() {
        let mut c = controller(Vec::new());
        c.set_tool(ToolKind::Ellipse);
        c.pointer_down(PointerSample::at(0.0, 0.0));
        c.pointer_move(PointerSample::at(30.0, 30.0));

        let mut list = DisplayList::new();
        render(&RenderContext::new(c.render_context()), &mut list);
        assert_eq!(list.shape_count(), 1);
        assert!(c.canvas().is_empty());
    }

    #[test]
    fn test_text_overlay_is_drawn() {
        let mut c = controller(Vec::new());
        c.set_tool(ToolKind::Text);
        c.pointer_down(PointerSample::at(10.0, 10.0));
        c.key_down(Key::Char('a'));

        let mut list = DisplayList::new();
        render(&RenderContext::new(c.render_context()), &mut list);
        assert!(matches!(
            list.commands().last(),
            Some(DrawCommand::Text { text, .. }) if text == "a"
        ));
    }

    #[test]
    fn test_redraw_only_when_requested() {
        let mut c = controller(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let style = RenderStyle::default();
        let mut list = DisplayList::new();

        assert!(redraw(&mut c, &style, &mut list));
        assert_eq!(list.shape_count(), 1);
        assert!(!redraw(&mut c, &style, &mut list));

        c.handle_remote(r#"{"type":"canvas:clear","room":"room"}"#);
        assert!(redraw(&mut c, &style, &mut list));
        assert_eq!(list.shape_count(), 0);
    }
}
