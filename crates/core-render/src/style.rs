//! Decoration layer: non-destructive overlays over ranges of the flattened buffer.
//!
//! A `Decoration` pairs a half-open byte range with a `DecorationKind`. Kinds
//! belong to independent layers (`Layers`): emphasis, foreground and
//! background. Removing one layer never touches another, so the updater can
//! strip colors from a range while typography stays in place.
//!
//! Design invariants:
//! * Decorations are kept sorted by `(start, end, layer)`; equal keys keep
//!   insertion order. Two layers built by the same sequence of operations
//!   therefore compare equal, which is what idempotence tests rely on.
//! * Multiple decorations may cover the same range (e.g. a style foreground
//!   followed by an override foreground). Later entries paint over earlier ones.
//! * Ranges are never clipped or merged; a decoration lives and dies whole.

use bitflags::bitflags;
use core_model::Color;
use std::ops::Range;

use crate::background::RoundedBackground;

bitflags! {
    /// Typographic emphasis carried by an `Emphasis` decoration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Emphasis: u8 {
        const BOLD = 0b0000_0001;
        const ITALIC = 0b0000_0010;
    }
}

bitflags! {
    /// Selector for decoration layers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Layers: u8 {
        const EMPHASIS = 0b0000_0001;
        const FOREGROUND = 0b0000_0010;
        const BACKGROUND = 0b0000_0100;
        const COLORS = Self::FOREGROUND.bits() | Self::BACKGROUND.bits();
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecorationKind {
    Emphasis(Emphasis),
    Foreground(Color),
    RoundedBackground(RoundedBackground),
}

impl DecorationKind {
    pub fn layer(&self) -> Layers {
        match self {
            DecorationKind::Emphasis(_) => Layers::EMPHASIS,
            DecorationKind::Foreground(_) => Layers::FOREGROUND,
            DecorationKind::RoundedBackground(_) => Layers::BACKGROUND,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decoration {
    pub range: Range<usize>,
    pub kind: DecorationKind,
}

impl Decoration {
    pub fn new(range: Range<usize>, kind: DecorationKind) -> Self {
        Self { range, kind }
    }

    fn key(&self) -> (usize, usize, u8) {
        (self.range.start, self.range.end, self.kind.layer().bits())
    }

    /// Fully contained in `range` (both ends inclusive of the bounds).
    pub fn is_within(&self, range: &Range<usize>) -> bool {
        range.start <= self.range.start && self.range.end <= range.end
    }

    pub fn covers(&self, offset: usize) -> bool {
        self.range.start <= offset && offset < self.range.end
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct DecorationLayer {
    decorations: Vec<Decoration>,
}

impl DecorationLayer {
    pub fn new() -> Self {
        Self {
            decorations: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.decorations.clear();
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    /// Insert keeping `(start, end, layer)` order; ties go after existing entries.
    /// Empty ranges are dropped since they decorate nothing.
    pub fn insert(&mut self, decoration: Decoration) {
        if decoration.range.is_empty() {
            return;
        }
        let key = decoration.key();
        let at = self.decorations.partition_point(|d| d.key() <= key);
        self.decorations.insert(at, decoration);
    }

    pub fn extend<I: IntoIterator<Item = Decoration>>(&mut self, iter: I) {
        for d in iter {
            self.insert(d);
        }
    }

    /// Remove decorations of the selected `layers` that lie entirely inside
    /// `range`. Returns how many were removed.
    pub fn remove_within(&mut self, range: Range<usize>, layers: Layers) -> usize {
        let before = self.decorations.len();
        // Only entries starting inside the range can be contained by it.
        let lo = self.decorations.partition_point(|d| d.range.start < range.start);
        let hi = self.decorations.partition_point(|d| d.range.start < range.end);
        let mut index = hi;
        while index > lo {
            index -= 1;
            let d = &self.decorations[index];
            if layers.contains(d.kind.layer()) && d.is_within(&range) {
                self.decorations.remove(index);
            }
        }
        before - self.decorations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn as_slice(&self) -> &[Decoration] {
        &self.decorations
    }

    /// Decorations fully inside `range`, in layer order.
    pub fn within(&self, range: Range<usize>) -> impl Iterator<Item = &Decoration> {
        let lo = self.decorations.partition_point(|d| d.range.start < range.start);
        let hi = self.decorations.partition_point(|d| d.range.start < range.end);
        self.decorations[lo..hi]
            .iter()
            .filter(move |d| d.is_within(&range))
    }

    /// Decorations covering `offset`.
    pub fn at(&self, offset: usize) -> impl Iterator<Item = &Decoration> {
        let hi = self.decorations.partition_point(|d| d.range.start <= offset);
        self.decorations[..hi]
            .iter()
            .filter(move |d| d.covers(offset))
    }

    /// Effective look at `offset`: emphasis is unioned, the last foreground
    /// and last background win.
    pub fn resolve(&self, offset: usize) -> ResolvedStyle {
        let mut out = ResolvedStyle::default();
        for d in self.at(offset) {
            match d.kind {
                DecorationKind::Emphasis(e) => out.emphasis |= e,
                DecorationKind::Foreground(c) => out.foreground = Some(c),
                DecorationKind::RoundedBackground(bg) => out.background = Some(bg.color),
            }
        }
        out
    }
}

/// Flattened view of all decorations at one position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub emphasis: Emphasis,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}
