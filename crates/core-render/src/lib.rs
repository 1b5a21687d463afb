//! Decoration + layout + surface plumbing for the flattened reading buffer.
//!
//! Pipeline position: `core-text` produces a `FlatText`; this crate decides
//! which visual overlays apply to each segment, keeps them in an ordered
//! `DecorationLayer`, and defines how a host surface is told to redraw.
//!
//! Exposed Components:
//! - `style`: `Decoration`, `DecorationKind`, `Emphasis` / `Layers` bitflags and
//!   the ordered `DecorationLayer` (layer-selective removal, per-offset resolve).
//! - `decorate`: `Palette`, `DecorationEngine` (style + status rules) and
//!   `RenderedText` (plain unless at least one decoration exists).
//! - `background`: `RoundedBackground` drawing contract over the `TextMeasure`
//!   and `Canvas` traits.
//! - `layout`: `TextLayout` hit-testing seam and the monospace `GridLayout`.
//! - `dirty`: merged dirty byte ranges awaiting a refresh.
//! - `surface`: `RenderSurface`, `ScrollHost` / `ScrollPolicy` composition and
//!   `force_refresh`.
//!
//! Invariants:
//! - Decorations never change buffer content or segment boundaries.
//! - Foreground and background are separate layers; clearing one leaves the
//!   other intact.
//! - Nothing here logs text content; only counts and ranges.

pub mod background;
pub mod decorate;
pub mod dirty;
pub mod layout;
pub mod style;
pub mod surface;

pub use background::{Canvas, FontMetrics, Rect, RoundedBackground, TextMeasure};
pub use decorate::{DecorationEngine, Decorations, Palette, RenderedText};
pub use dirty::DirtyRanges;
pub use layout::{GridLayout, TextLayout};
pub use style::{Decoration, DecorationKind, DecorationLayer, Emphasis, Layers, ResolvedStyle};
pub use surface::{
    RecordingScroll, RecordingSurface, RenderSurface, ScrollHost, ScrollPolicy, Scrollable,
    force_refresh,
};
