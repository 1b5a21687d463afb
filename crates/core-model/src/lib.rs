//! Document model for annotated reading text.
//!
//! A `Document` is rebuilt in full on every ingestion and is owned by a single
//! render pass. It is a plain ordered tree: `Document -> Paragraph -> Segment`.
//! Everything derived from it (the flattened buffer, the segment index, the
//! decoration layer) lives in downstream crates and is rebuilt together.
//!
//! Why separate ids from positions?
//! --------------------------------
//! Positions (`start`/`end` into the flattened buffer) are only meaningful for
//! one flattening pass. `ParagraphId` and `SegmentId` are stable for the
//! lifetime of a `Document` so outbound events can name a segment without
//! leaking buffer offsets to collaborators.
//!
//! Invariants:
//! * Segments never overlap; concatenating `segment.text` in order reproduces
//!   `Paragraph::text()` exactly.
//! * `TermId::UNASSIGNED` (0) groups nothing; it marks segments without a term.
//! * `Status` is an opaque integer code. Only the values documented on
//!   `Status` carry meaning; anything else renders like an unknown code
//!   (see `core-render`).
//!
//! Non-goals:
//! * Mutation helpers. Status changes after ingestion are applied to the
//!   retained segment index (`core-text::FlatText`), never back into the model.

mod color;

pub use color::{Color, ColorParseError};

/// Stable identifier of a paragraph inside one `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ParagraphId(pub u64);

/// Stable identifier of a segment inside one `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SegmentId(pub u64);

/// Identity shared by every occurrence of the same learnable term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TermId(pub u64);

impl TermId {
    /// Segment is not linked to any term.
    pub const UNASSIGNED: TermId = TermId(0);

    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

/// Language identifier as supplied by the document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LanguageId(pub u32);

/// Learning progress code of a term.
///
/// * `0` unknown (no learning data)
/// * `1..=5` graduated learning stages
/// * `98` ignored
/// * `99` well-known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Status(pub i32);

impl Status {
    pub const UNKNOWN: Status = Status(0);
    pub const IGNORED: Status = Status(98);
    pub const WELL_KNOWN: Status = Status(99);

    /// Class token prefix used by annotated markup (`status3`).
    pub const CLASS_PREFIX: &'static str = "status";

    pub const fn new(raw: i32) -> Self {
        Status(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// `true` for any code greater than zero (the term carries learning data).
    pub const fn has_progress(self) -> bool {
        self.0 > 0
    }

    /// Learning stage `1..=5`, `None` for every other code.
    pub fn learning_stage(self) -> Option<u8> {
        match self.0 {
            1..=5 => Some(self.0 as u8),
            _ => None,
        }
    }

    /// Parse a `status<N>` class token. Returns `None` when the token does not
    /// carry the prefix; a prefixed token with an unparsable suffix yields
    /// `Status::UNKNOWN` (malformed markup is never fatal).
    pub fn parse_class(token: &str) -> Option<Status> {
        let suffix = token.strip_prefix(Self::CLASS_PREFIX)?;
        Some(suffix.parse::<i32>().map(Status).unwrap_or(Status::UNKNOWN))
    }
}

/// Typographic attributes of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentStyle {
    /// CSS-like weight scale; `> 500` renders bold.
    pub font_weight: u16,
    pub is_italic: bool,
    /// Explicit foreground color requested by the source, if any.
    pub color: Option<Color>,
}

impl SegmentStyle {
    pub const NORMAL_WEIGHT: u16 = 400;
    pub const BOLD_WEIGHT: u16 = 700;

    pub fn is_bold(&self) -> bool {
        self.font_weight > 500
    }
}

impl Default for SegmentStyle {
    fn default() -> Self {
        Self {
            font_weight: Self::NORMAL_WEIGHT,
            is_italic: false,
            color: None,
        }
    }
}

/// Atomic unit of annotated text (a word, a punctuation run or a literal span).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: SegmentId,
    pub text: String,
    pub style: SegmentStyle,
    /// Eligible for tap handling.
    pub is_interactive: bool,
    pub status: Status,
    pub term_id: TermId,
    pub language_id: LanguageId,
}

impl Segment {
    /// Non-interactive literal text with default style and no learning data.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            id: SegmentId::default(),
            text: text.into(),
            style: SegmentStyle::default(),
            is_interactive: false,
            status: Status::UNKNOWN,
            term_id: TermId::UNASSIGNED,
            language_id: LanguageId::default(),
        }
    }

    /// Interactive word linked to `term` with the given status.
    pub fn term(text: impl Into<String>, term: TermId, status: Status) -> Self {
        Self {
            is_interactive: true,
            status,
            term_id: term,
            ..Self::plain(text)
        }
    }

    pub fn with_id(mut self, id: SegmentId) -> Self {
        self.id = id;
        self
    }

    pub fn with_style(mut self, style: SegmentStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_language(mut self, language: LanguageId) -> Self {
        self.language_id = language;
        self
    }
}

/// Ordered run of segments rendered as one block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub id: ParagraphId,
    pub segments: Vec<Segment>,
}

impl Paragraph {
    pub fn new(id: ParagraphId, segments: Vec<Segment>) -> Self {
        Self { id, segments }
    }

    /// Concatenated segment text (the exact paragraph text).
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// `true` when no segment carries any character.
    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.text.is_empty())
    }
}

/// One ingested snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn segment_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.segments.len()).sum()
    }

    /// Iterate every segment in document order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.paragraphs.iter().flat_map(|p| p.segments.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_text_concatenates_segments() {
        let p = Paragraph::new(
            ParagraphId(1),
            vec![
                Segment::term("Hola", TermId(1), Status::UNKNOWN),
                Segment::plain(" "),
                Segment::term("mundo", TermId(2), Status(3)),
            ],
        );
        assert_eq!(p.text(), "Hola mundo");
        assert!(!p.is_blank());
    }

    #[test]
    fn status_class_parsing_falls_back_to_unknown() {
        assert_eq!(Status::parse_class("status3"), Some(Status(3)));
        assert_eq!(Status::parse_class("status99"), Some(Status::WELL_KNOWN));
        assert_eq!(Status::parse_class("statusX"), Some(Status::UNKNOWN));
        assert_eq!(Status::parse_class("status"), Some(Status::UNKNOWN));
        assert_eq!(Status::parse_class("word"), None);
    }

    #[test]
    fn status_classification() {
        assert!(!Status::UNKNOWN.has_progress());
        assert!(Status::IGNORED.has_progress());
        assert_eq!(Status(4).learning_stage(), Some(4));
        assert_eq!(Status::WELL_KNOWN.learning_stage(), None);
        assert_eq!(Status(-1).learning_stage(), None);
    }

    #[test]
    fn bold_threshold_is_strictly_above_500() {
        let mut style = SegmentStyle::default();
        assert!(!style.is_bold());
        style.font_weight = 500;
        assert!(!style.is_bold());
        style.font_weight = 501;
        assert!(style.is_bold());
    }

    #[test]
    fn document_counts() {
        let doc = Document::new(vec![
            Paragraph::new(ParagraphId(0), vec![Segment::plain("a"), Segment::plain("b")]),
            Paragraph::new(ParagraphId(1), vec![]),
        ]);
        assert_eq!(doc.paragraph_count(), 2);
        assert_eq!(doc.segment_count(), 2);
        assert!(doc.paragraphs[1].is_blank());
    }
}
