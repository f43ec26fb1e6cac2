//! InkRoom Render Library
//!
//! Renderer abstraction for InkRoom: a stable options object, the
//! hand-drawn path effect, pressure-weighted freehand outlines, and a
//! recording surface for headless use.

mod display_list;
pub mod freehand;
mod options;
mod renderer;

pub use display_list::{DisplayList, DrawCommand};
pub use freehand::freehand_outline;
pub use options::{RoughOptions, sketch_path};
pub use renderer::{HANDLE_SIZE, RenderContext, RenderStyle, Surface, redraw, render, render_shape};
