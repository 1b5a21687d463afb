//! Crossterm-backed `RenderSurface`.
//!
//! The surface keeps an owned snapshot of the last pushed text and its
//! decorations. Drawing happens on `request_layout`: the snapshot is wrapped
//! into a `GridLayout` and every cell is printed with the style resolved at
//! its offset. Only style transitions emit escape sequences. Cells reserved
//! for background padding print as plain spaces.

use core_model::Color;
use core_render::{
    DecorationLayer, Emphasis, GridLayout, RenderSurface, RenderedText, ResolvedStyle,
};
use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use std::io::{self, Write};
use std::ops::Range;
use tracing::{trace, warn};

fn term_color(c: Color) -> Option<TermColor> {
    (!c.is_transparent()).then_some(TermColor::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    })
}

pub struct TerminalSurface<W: Write> {
    out: W,
    columns: u16,
    text: String,
    layer: Option<DecorationLayer>,
    pending: Vec<Range<usize>>,
    frames: usize,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, columns: u16) -> Self {
        Self {
            out,
            columns,
            text: String::new(),
            layer: None,
            pending: Vec::new(),
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn apply_style(&mut self, style: &ResolvedStyle) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        if style.emphasis.contains(Emphasis::BOLD) {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if style.emphasis.contains(Emphasis::ITALIC) {
            queue!(self.out, SetAttribute(Attribute::Italic))?;
        }
        if let Some(fg) = style.foreground.and_then(term_color) {
            queue!(self.out, SetForegroundColor(fg))?;
        }
        if let Some(bg) = style.background.and_then(term_color) {
            queue!(self.out, SetBackgroundColor(bg))?;
        }
        Ok(())
    }

    /// Layout used for both drawing and hit-testing this snapshot.
    pub fn layout(&self) -> GridLayout {
        match &self.layer {
            Some(layer) => GridLayout::with_decorations(&self.text, self.columns, 1.0, 1.0, layer),
            None => GridLayout::new(&self.text, self.columns),
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let grid = self.layout();
        let text = std::mem::take(&mut self.text);
        let mut current = ResolvedStyle::default();
        for row in grid.rows() {
            let mut next_col: u16 = 0;
            for cell in &row.cells {
                if cell.col > next_col {
                    // Reserved background padding is printed unstyled.
                    if current != ResolvedStyle::default() {
                        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
                        current = ResolvedStyle::default();
                    }
                    let gap = " ".repeat(usize::from(cell.col - next_col));
                    queue!(self.out, Print(gap))?;
                }
                let style = self
                    .layer
                    .as_ref()
                    .map(|l| l.resolve(cell.offset))
                    .unwrap_or_default();
                if style != current {
                    self.apply_style(&style)?;
                    current = style;
                }
                let grapheme = &text[cell.offset..cell.offset + cell.len];
                // Tabs were normalised upstream; anything else non-printing shows as a space.
                let shown = if grapheme.chars().any(char::is_control) {
                    " "
                } else {
                    grapheme
                };
                queue!(self.out, Print(shown))?;
                next_col = cell.col.saturating_add(cell.width);
            }
            if current != ResolvedStyle::default() {
                queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
                current = ResolvedStyle::default();
            }
            queue!(self.out, Print("\n"))?;
        }
        self.text = text;
        self.out.flush()
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn set_text(&mut self, text: &RenderedText<'_>) {
        self.text = text.text().to_string();
        self.layer = text.layer().cloned();
    }

    fn invalidate(&mut self, dirty: &[Range<usize>]) {
        self.pending.extend(dirty.iter().cloned());
    }

    fn request_layout(&mut self) {
        let dirty = std::mem::take(&mut self.pending);
        match self.draw() {
            Ok(()) => {
                self.frames += 1;
                trace!(
                    target: "render.terminal",
                    frame = self.frames,
                    dirty_ranges = dirty.len(),
                    "frame_drawn"
                );
            }
            Err(e) => warn!(target: "render.terminal", error = %e, "frame_write_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_render::{Decoration, DecorationKind, force_refresh};

    fn surface() -> TerminalSurface<Vec<u8>> {
        TerminalSurface::new(Vec::new(), 80)
    }

    #[test]
    fn plain_text_prints_rows_without_escapes() {
        let mut s = surface();
        force_refresh(&mut s, &RenderedText::Plain("Hola\nmundo"), &[0..10]);
        let out = String::from_utf8(s.into_inner()).unwrap_or_default();
        assert_eq!(out, "Hola\nmundo\n");
    }

    #[test]
    fn decorated_cells_switch_style_once_per_run() {
        let mut layer = DecorationLayer::new();
        layer.insert(Decoration::new(
            5..10,
            DecorationKind::Foreground(Color::rgb(0x1E, 0x88, 0xE5)),
        ));
        let mut s = surface();
        force_refresh(&mut s, &RenderedText::new("Hola mundo", &layer), &[5..10]);
        assert_eq!(s.frames(), 1);
        let out = String::from_utf8(s.into_inner()).unwrap_or_default();
        assert!(out.starts_with("Hola "));
        assert_eq!(out.matches("38;2;30;136;229").count(), 1);
        assert!(out.contains("mundo"));
    }

    #[test]
    fn background_padding_is_printed_before_the_word() {
        let mut layer = DecorationLayer::new();
        layer.insert(Decoration::new(
            5..10,
            DecorationKind::RoundedBackground(core_render::RoundedBackground::new(
                Color::rgb(0xF5, 0xE1, 0xA9),
                2.0,
                2.0,
                1.0,
                6.0,
            )),
        ));
        let mut s = surface();
        force_refresh(&mut s, &RenderedText::new("Hola mundo", &layer), &[5..10]);
        assert_eq!(s.layout().rows()[0].cells[5].col, 7);
        let out = String::from_utf8(s.into_inner()).unwrap_or_default();
        assert!(out.starts_with("Hola   "), "one space plus two reserved cells");
        assert_eq!(out.matches("48;2;245;225;169").count(), 1);
    }

    #[test]
    fn transparent_colors_emit_nothing() {
        assert_eq!(term_color(Color::TRANSPARENT), None);
        assert!(term_color(Color::BLACK).is_some());
    }
}
