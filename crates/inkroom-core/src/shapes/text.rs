//! Text metrics.

use kurbo::Size;

/// Measures laid-out text. A text shape's bbox comes from this once, at
/// creation, and is never recomputed.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f64) -> Size;
}

/// Estimate from character counts, for hosts without a text layout engine.
#[derive(Debug, Clone, Copy)]
pub struct ApproxTextMeasure {
    /// Average glyph advance as a fraction of the font size.
    pub char_width_factor: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
}

impl Default for ApproxTextMeasure {
    fn default() -> Self {
        Self {
            char_width_factor: 0.55,
            line_height: 1.2,
        }
    }
}

impl TextMeasure for ApproxTextMeasure {
    fn measure(&self, text: &str, font_size: f64) -> Size {
        let widest = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        // lines() drops a trailing empty line
        let mut line_count = text.lines().count().max(1);
        if text.ends_with('\n') {
            line_count += 1;
        }
        Size::new(
            widest as f64 * font_size * self.char_width_factor,
            line_count as f64 * font_size * self.line_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let size = ApproxTextMeasure::default().measure("hello", 20.0);
        assert!((size.width - 5.0 * 20.0 * 0.55).abs() < 1e-9);
        assert!((size.height - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_line_uses_widest() {
        let size = ApproxTextMeasure::default().measure("ab\nabcd\n", 10.0);
        assert!((size.width - 4.0 * 10.0 * 0.55).abs() < 1e-9);
        assert!((size.height - 3.0 * 12.0).abs() < 1e-9);
    }
}
