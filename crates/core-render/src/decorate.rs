//! Decoration rules: segment style + status → decorations.
//!
//! Rules, evaluated per `SegmentInfo`:
//! * Typography: `Emphasis::BOLD` when `font_weight > 500`, `ITALIC` when
//!   italic, both when both. No decoration when neither.
//! * Style color: a foreground only when set and different from the palette's
//!   neutral color; the surface default is never overridden otherwise.
//! * Status (skipped for punctuation-only text):
//!   - interactive, status > 0: rounded background from the status table, plus
//!     the override foreground when one is configured.
//!   - interactive, status == 0: accent foreground, no background.
//!   - non-interactive, status > 0: background only.
//!
//! Statuses 98 / 99 resolve to transparent backgrounds by default. A
//! transparent table entry produces no decoration at all, and because those
//! statuses are > 0 they never receive the accent foreground either.

use core_config::{ConfigFile, HighlightConfig};
use core_model::{Color, Status};
use core_text::boundary::is_punctuation_only;
use core_text::{FlatText, SegmentInfo};
use smallvec::SmallVec;
use tracing::debug;

use crate::background::RoundedBackground;
use crate::style::{Decoration, DecorationKind, DecorationLayer, Emphasis};

/// Resolved colors used by the rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub learning: [Color; 5],
    pub well_known: Color,
    pub ignored: Color,
    pub accent: Color,
    pub override_foreground: Option<Color>,
    pub neutral: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&core_config::PaletteConfig::default())
    }
}

impl Palette {
    pub fn from_config(cfg: &core_config::PaletteConfig) -> Self {
        Self {
            learning: cfg.learning_colors(),
            well_known: cfg.well_known_color(),
            ignored: cfg.ignored_color(),
            accent: cfg.accent_color(),
            override_foreground: cfg.override_foreground_color(),
            neutral: cfg.neutral_color(),
        }
    }

    /// Background for `status`; `None` for statuses without an entry or a
    /// transparent entry.
    pub fn background_for(&self, status: Status) -> Option<Color> {
        let color = match status {
            Status::WELL_KNOWN => self.well_known,
            Status::IGNORED => self.ignored,
            s => self.learning[usize::from(s.learning_stage()?) - 1],
        };
        (!color.is_transparent()).then_some(color)
    }
}

pub type Decorations = SmallVec<[Decoration; 4]>;

/// The buffer handed to a surface: plain unless something decorates it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderedText<'a> {
    Plain(&'a str),
    Decorated {
        text: &'a str,
        layer: &'a DecorationLayer,
    },
}

impl<'a> RenderedText<'a> {
    pub fn new(text: &'a str, layer: &'a DecorationLayer) -> Self {
        if layer.is_empty() {
            RenderedText::Plain(text)
        } else {
            RenderedText::Decorated { text, layer }
        }
    }

    pub fn text(&self) -> &'a str {
        match self {
            RenderedText::Plain(text) => text,
            RenderedText::Decorated { text, .. } => text,
        }
    }

    pub fn layer(&self) -> Option<&'a DecorationLayer> {
        match self {
            RenderedText::Plain(_) => None,
            RenderedText::Decorated { layer, .. } => Some(layer),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DecorationEngine {
    palette: Palette,
    highlight: HighlightConfig,
}

impl DecorationEngine {
    pub fn new(palette: Palette, highlight: HighlightConfig) -> Self {
        Self { palette, highlight }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(Palette::from_config(&cfg.palette), cfg.highlight)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn background(&self, color: Color) -> RoundedBackground {
        RoundedBackground::new(
            color,
            self.highlight.padding_left,
            self.highlight.padding_right,
            self.highlight.padding_vertical,
            self.highlight.corner_radius,
        )
    }

    /// Every decoration for one segment, typography first.
    pub fn decorations_for(&self, info: &SegmentInfo) -> Decorations {
        let mut out = Decorations::new();
        let style = &info.segment.style;
        let mut emphasis = Emphasis::empty();
        if style.is_bold() {
            emphasis |= Emphasis::BOLD;
        }
        if style.is_italic {
            emphasis |= Emphasis::ITALIC;
        }
        if !emphasis.is_empty() {
            out.push(Decoration::new(info.range(), DecorationKind::Emphasis(emphasis)));
        }
        out.extend(self.color_decorations(info, info.segment.status));
        out
    }

    /// Foreground and background decorations for `info` as if it had `status`.
    /// This is the part the updater recomputes.
    pub fn color_decorations(&self, info: &SegmentInfo, status: Status) -> Decorations {
        let mut out = Decorations::new();
        let range = info.range();
        if let Some(color) = info.segment.style.color {
            if color != self.palette.neutral {
                out.push(Decoration::new(range.clone(), DecorationKind::Foreground(color)));
            }
        }
        if is_punctuation_only(&info.segment.text) {
            return out;
        }
        if status.has_progress() {
            if let Some(color) = self.palette.background_for(status) {
                out.push(Decoration::new(
                    range.clone(),
                    DecorationKind::RoundedBackground(self.background(color)),
                ));
            }
            if info.segment.is_interactive {
                if let Some(color) = self.palette.override_foreground {
                    out.push(Decoration::new(range, DecorationKind::Foreground(color)));
                }
            }
        } else if info.segment.is_interactive && status == Status::UNKNOWN {
            out.push(Decoration::new(
                range,
                DecorationKind::Foreground(self.palette.accent),
            ));
        }
        out
    }

    /// Build the full decoration layer for a flattened document.
    pub fn decorate(&self, flat: &FlatText) -> DecorationLayer {
        let mut layer = DecorationLayer::new();
        for info in flat.segments() {
            layer.extend(self.decorations_for(info));
        }
        debug!(
            target: "render.decorate",
            segments = flat.segments().len(),
            decorations = layer.len(),
            "decorate_complete"
        );
        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{Paragraph, ParagraphId, Segment, SegmentStyle, TermId};
    use core_text::flatten;
    use pretty_assertions::assert_eq;

    fn info(segment: Segment) -> SegmentInfo {
        let flat = flatten(&[Paragraph::new(ParagraphId(0), vec![segment])]);
        flat.segments()[0].clone()
    }

    fn kinds(ds: &Decorations) -> Vec<DecorationKind> {
        ds.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn typography_combinations() {
        let e = DecorationEngine::default();
        let bold_italic = SegmentStyle {
            font_weight: 700,
            is_italic: true,
            color: None,
        };
        let ds = e.decorations_for(&info(Segment::plain("ab").with_style(bold_italic)));
        assert_eq!(
            kinds(&ds),
            vec![DecorationKind::Emphasis(Emphasis::BOLD | Emphasis::ITALIC)]
        );
        let semi = SegmentStyle {
            font_weight: 500,
            ..SegmentStyle::default()
        };
        assert!(e.decorations_for(&info(Segment::plain("ab").with_style(semi))).is_empty());
    }

    #[test]
    fn neutral_style_color_is_not_applied() {
        let e = DecorationEngine::default();
        let neutral = SegmentStyle {
            color: Some(Color::BLACK),
            ..SegmentStyle::default()
        };
        assert!(e.decorations_for(&info(Segment::plain("ab").with_style(neutral))).is_empty());
        let red = SegmentStyle {
            color: Some(Color::rgb(200, 0, 0)),
            ..SegmentStyle::default()
        };
        assert_eq!(
            kinds(&e.decorations_for(&info(Segment::plain("ab").with_style(red)))),
            vec![DecorationKind::Foreground(Color::rgb(200, 0, 0))]
        );
    }

    #[test]
    fn interactive_status_zero_gets_accent_only() {
        let e = DecorationEngine::default();
        let ds = e.decorations_for(&info(Segment::term("Hola", TermId(1), Status::UNKNOWN)));
        assert_eq!(kinds(&ds), vec![DecorationKind::Foreground(e.palette().accent)]);
    }

    #[test]
    fn learning_status_gets_table_background() {
        let e = DecorationEngine::default();
        let ds = e.decorations_for(&info(Segment::term("mundo", TermId(2), Status(3))));
        assert_eq!(ds.len(), 1);
        match ds[0].kind {
            DecorationKind::RoundedBackground(bg) => {
                assert_eq!(bg.color, e.palette().learning[2]);
                assert_eq!(bg.corner_radius, HighlightConfig::default().corner_radius);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ignored_and_well_known_have_no_background_and_no_accent() {
        let e = DecorationEngine::default();
        for status in [Status::IGNORED, Status::WELL_KNOWN] {
            let ds = e.decorations_for(&info(Segment::term("x", TermId(1), status)));
            assert!(ds.is_empty(), "status {status:?}");
        }
    }

    #[test]
    fn override_foreground_only_for_interactive() {
        let palette = Palette {
            override_foreground: Some(Color::rgb(1, 2, 3)),
            ..Palette::default()
        };
        let e = DecorationEngine::new(palette, HighlightConfig::default());
        let ds = e.decorations_for(&info(Segment::term("x", TermId(1), Status(1))));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds[1].kind, DecorationKind::Foreground(Color::rgb(1, 2, 3)));

        let mut plain = Segment::plain("x");
        plain.status = Status(1);
        let ds = e.decorations_for(&info(plain));
        assert_eq!(ds.len(), 1);
        assert!(matches!(ds[0].kind, DecorationKind::RoundedBackground(_)));
    }

    #[test]
    fn punctuation_only_skips_status_rules() {
        let e = DecorationEngine::default();
        assert!(e
            .decorations_for(&info(Segment::term("...", TermId(4), Status(2))))
            .is_empty());
        assert!(e
            .decorations_for(&info(Segment::term("¡!", TermId(4), Status::UNKNOWN)))
            .is_empty());
    }

    #[test]
    fn rendered_text_is_plain_without_decorations() {
        let flat = flatten(&[Paragraph::new(
            ParagraphId(0),
            vec![Segment::plain("plain text")],
        )]);
        let layer = DecorationEngine::default().decorate(&flat);
        assert_eq!(RenderedText::new(flat.buffer(), &layer), RenderedText::Plain("plain text"));

        let flat = flatten(&[Paragraph::new(
            ParagraphId(0),
            vec![Segment::term("Hola", TermId(1), Status::UNKNOWN)],
        )]);
        let layer = DecorationEngine::default().decorate(&flat);
        let rendered = RenderedText::new(flat.buffer(), &layer);
        assert_eq!(rendered.text(), "Hola");
        assert_eq!(rendered.layer().map(|l| l.len()), Some(1));
    }
}
