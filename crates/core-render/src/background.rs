//! Rounded per-word background: the drawing contract.
//!
//! The decoration replaces the plain run of glyphs for its range with a box:
//!
//! ```text
//!   x          x+pad_left                 x+pad_left+width      x+advance
//!   |<-pad_left->|<------ text width ------->|<-pad_right->|
//!   +--------------------------------------------------------+  baseline + ascent - vpad
//!   |            glyphs drawn unmodified at baseline         |
//!   +--------------------------------------------------------+  baseline + descent + vpad
//! ```
//!
//! * `advance` is what the layout system must reserve so following text does
//!   not overlap the padding: measured text width plus both paddings.
//! * `ascent` / `descent` are baseline-relative (ascent is negative, pointing
//!   up), matching the usual font metric convention.
//! * The rectangle is painted first, glyphs second; glyph color is whatever the
//!   caller's paint says (foreground decorations stay independent).
//!
//! Rendering backends plug in through `TextMeasure` and `Canvas`.

use core_model::Color;

/// Baseline-relative vertical metrics of the current line's font.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

pub trait TextMeasure {
    /// Exact advance width of `text` in surface units.
    fn measure(&self, text: &str) -> f32;
    fn metrics(&self) -> FontMetrics;
}

pub trait Canvas {
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color);
    fn draw_text(&mut self, text: &str, x: f32, baseline: f32);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundedBackground {
    pub color: Color,
    pub padding_left: f32,
    pub padding_right: f32,
    pub padding_vertical: f32,
    pub corner_radius: f32,
}

impl RoundedBackground {
    pub fn new(
        color: Color,
        padding_left: f32,
        padding_right: f32,
        padding_vertical: f32,
        corner_radius: f32,
    ) -> Self {
        Self {
            color,
            padding_left,
            padding_right,
            padding_vertical,
            corner_radius,
        }
    }

    /// Total horizontal space reported to layout.
    pub fn advance(&self, measure: &dyn TextMeasure, text: &str) -> f32 {
        measure.measure(text) + self.padding_left + self.padding_right
    }

    /// Box occupied by the background for `text` starting at `x`.
    pub fn bounds(&self, measure: &dyn TextMeasure, text: &str, x: f32, baseline: f32) -> Rect {
        let m = measure.metrics();
        Rect {
            left: x,
            top: baseline + m.ascent - self.padding_vertical,
            right: x + self.advance(measure, text),
            bottom: baseline + m.descent + self.padding_vertical,
        }
    }

    /// Paint the background, then the glyphs on top. Returns the advance.
    pub fn draw(
        &self,
        canvas: &mut dyn Canvas,
        measure: &dyn TextMeasure,
        text: &str,
        x: f32,
        baseline: f32,
    ) -> f32 {
        let rect = self.bounds(measure, text, x, baseline);
        canvas.fill_rounded_rect(rect, self.corner_radius, self.color);
        canvas.draw_text(text, x + self.padding_left, baseline);
        rect.width()
    }
}
