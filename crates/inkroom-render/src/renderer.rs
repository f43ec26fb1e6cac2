//! Renderer abstraction and the redraw policy.

use crate::freehand::freehand_outline;
use crate::options::RoughOptions;
use inkroom_core::controller::{Frame, InteractionController, TextOverlay};
use inkroom_core::selection::{HandleKind, get_handles};
use inkroom_core::shapes::{ApproxTextMeasure, Shape, ShapeKind, TextMeasure};
use inkroom_core::sync::Transport;
use kurbo::{Affine, BezPath, Circle, Rect, Shape as _};
use peniko::Color;

/// Edge length of the square resize handles.
pub const HANDLE_SIZE: f64 = 8.0;

/// Opaque drawing backend.
///
/// Shape paths come in the shape's unrotated frame together with the
/// transform that places them on the canvas.
pub trait Surface {
    /// Start a new frame.
    fn clear(&mut self, background: Color);

    /// Stroke (and fill, per `options`) a sketchy shape path.
    fn draw_shape(&mut self, path: &BezPath, options: &RoughOptions, transform: Affine);

    /// Fill a polygon with a solid color.
    fn fill_path(&mut self, path: &BezPath, color: Color, transform: Affine);

    fn draw_text(&mut self, text: &str, bounds: Rect, color: Color, transform: Affine);

    /// Thin UI stroke for selection outlines, handles and the marquee.
    fn stroke_overlay(&mut self, path: &BezPath, color: Color, dashed: bool, transform: Affine);
}

/// Colors and metrics of the UI chrome.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub background_color: Color,
    pub selection_color: Color,
    /// Font size of the text overlay.
    pub font_size: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background_color: Color::from_rgba8(250, 250, 250, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            font_size: 20.0,
        }
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    pub frame: Frame<'a>,
    pub style: RenderStyle,
}

impl<'a> RenderContext<'a> {
    pub fn new(frame: Frame<'a>) -> Self {
        Self {
            frame,
            style: RenderStyle::default(),
        }
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.style.background_color = color;
        self
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.style.selection_color = color;
        self
    }
}

/// Draw a whole frame: background, shapes in list order, the live preview,
/// then selection chrome, the marquee and the text overlay.
pub fn render(ctx: &RenderContext, surface: &mut dyn Surface) {
    let frame = &ctx.frame;
    surface.clear(ctx.style.background_color);

    for shape in frame.shapes {
        render_shape(surface, shape);
    }
    if let Some(preview) = &frame.preview {
        render_shape(surface, preview);
    }
    if let Some(selected) = frame.selected {
        render_selection(surface, selected, ctx.style.selection_color);
    }
    if let Some(marquee) = frame.marquee {
        surface.stroke_overlay(
            &marquee.to_path(0.1),
            ctx.style.selection_color,
            true,
            Affine::IDENTITY,
        );
    }
    if let Some(overlay) = frame.overlay {
        render_overlay(surface, overlay, &ctx.style);
    }
}

/// Draw one shape.
pub fn render_shape(surface: &mut dyn Surface, shape: &Shape) {
    let transform = shape.transform();
    let options = RoughOptions::from(&shape.options);
    match shape.kind {
        ShapeKind::Freehand => {
            let outline = freehand_outline(shape.samples(), options.stroke_width);
            surface.fill_path(&outline, options.stroke, transform);
        }
        ShapeKind::Text => {
            let text = shape.text.as_deref().unwrap_or_default();
            surface.draw_text(text, shape.bounds(), options.stroke, transform);
        }
        _ => surface.draw_shape(&shape.to_path(), &options, transform),
    }
}

fn render_selection(surface: &mut dyn Surface, shape: &Shape, color: Color) {
    surface.stroke_overlay(&shape.bounds().to_path(0.1), color, true, shape.transform());

    // handle positions are already in canvas coordinates
    for handle in get_handles(shape) {
        let path = match handle.kind {
            HandleKind::Resize(_) => {
                Rect::from_center_size(handle.position, (HANDLE_SIZE, HANDLE_SIZE)).to_path(0.1)
            }
            HandleKind::Rotate => Circle::new(handle.position, HANDLE_SIZE / 2.0).to_path(0.1),
        };
        surface.stroke_overlay(&path, color, false, Affine::IDENTITY);
    }
}

fn render_overlay(surface: &mut dyn Surface, overlay: &TextOverlay, style: &RenderStyle) {
    // keep a visible box while the buffer is still empty
    let text = if overlay.buffer.is_empty() { " " } else { &overlay.buffer };
    let size = ApproxTextMeasure::default().measure(text, style.font_size);
    let bounds = Rect::from_origin_size(overlay.origin, size);
    surface.stroke_overlay(&bounds.to_path(0.1), style.selection_color, true, Affine::IDENTITY);
    surface.draw_text(&overlay.buffer, bounds, Color::BLACK, Affine::IDENTITY);
}

/// Render the controller's frame if it asked for a redraw.
///
/// Returns whether anything was drawn.
pub fn redraw<T: Transport>(
    controller: &mut InteractionController<T>,
    style: &RenderStyle,
    surface: &mut dyn Surface,
) -> bool {
    if !controller.take_redraw() {
        return false;
    }
    let ctx = RenderContext::new(controller.render_context()).with_style(style.clone());
    render(&ctx, surface);
    log::trace!("Rendered {} shapes", controller.canvas().len());
    true
}
