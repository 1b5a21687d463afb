//! Markup ingestion: HTML-ish reader pages → `Document`.
//!
//! Two source shapes are accepted, block by block, without knowing upfront
//! which one the upstream page uses:
//!
//! * pre-rendered: a block holds plain text only. The whole block becomes one
//!   non-interactive, status-0 segment with trimmed, whitespace-collapsed text.
//!   Placeholder blocks (whitespace / NBSP only) carry no text.
//! * annotated: words are wrapped in elements carrying a term attribute and/or
//!   a `status<N>` class token. Each word becomes one segment; bare text
//!   between words becomes non-interactive status-0 segments.
//!
//! Paragraph rules:
//! * Block elements (configurable) delimit paragraphs; the innermost open
//!   block receives text. Text of an outer block surrounding nested blocks is
//!   emitted as its own paragraph when non-empty.
//! * A block that closes empty is kept as an empty paragraph only once some
//!   earlier paragraph has content (no leading blank paragraphs).
//!
//! Malformed input is recovered locally: a missing or unparsable term id is
//! `0`, an unparsable status suffix is status `0`, missing text is empty,
//! unknown entities stay literal. A tokenizer error ends the document early;
//! `parse` logs it and returns what was read, `parse_strict` returns it.
//!
//! Tokenizing is done by `quick-xml` in lenient mode (end names unchecked,
//! HTML attribute syntax); void elements never open a frame.

use ahash::AHashSet;
use core_config::MarkupConfig;
use core_model::{
    Color, Document, LanguageId, Paragraph, ParagraphId, Segment, SegmentId, SegmentStyle, Status,
    TermId,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::{debug, warn};

mod text;

use text::{collapse_html_whitespace, decode_entities, is_placeholder};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("markup error at byte {position}: {message}")]
    Markup { position: usize, message: String },
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const SKIP_TAGS: &[&str] = &["script", "style", "head", "title", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Block,
    Word,
    Inline,
    Skip,
}

#[derive(Debug)]
struct Frame {
    tag: String,
    kind: FrameKind,
    style: SegmentStyle,
}

#[derive(Debug)]
struct WordBuilder {
    term: TermId,
    status: Status,
    interactive: bool,
    language: LanguageId,
    style: SegmentStyle,
    text: String,
}

#[derive(Debug, Default)]
struct BlockBuilder {
    id: Option<u64>,
    segments: Vec<Segment>,
    run: String,
    run_style: SegmentStyle,
    fallback: String,
    annotated: bool,
    nested_blocks: bool,
}

impl BlockBuilder {
    fn new(id: Option<u64>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn flush_run(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let text = collapse_html_whitespace(&std::mem::take(&mut self.run));
        self.segments
            .push(Segment::plain(text).with_style(self.run_style));
    }

    /// Final segment list, or empty when the block carries no text.
    fn take_segments(&mut self) -> Vec<Segment> {
        self.flush_run();
        let fallback = std::mem::take(&mut self.fallback);
        let mut segments = std::mem::take(&mut self.segments);
        let annotated = std::mem::replace(&mut self.annotated, false);
        if !annotated {
            let text = collapse_html_whitespace(&fallback);
            if is_placeholder(&text) {
                return Vec::new();
            }
            return vec![Segment::plain(text.trim())];
        }
        if let Some(first) = segments.first_mut().filter(|s| !s.is_interactive) {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = segments.last_mut().filter(|s| !s.is_interactive) {
            last.text = last.text.trim_end().to_string();
        }
        segments.retain(|s| s.is_interactive || s.term_id.is_assigned() || !s.text.is_empty());
        segments
    }
}

/// Stateful single-pass converter; one per `parse` call.
struct Builder<'c> {
    cfg: &'c MarkupConfig,
    frames: Vec<Frame>,
    blocks: Vec<BlockBuilder>,
    word: Option<WordBuilder>,
    paragraphs: Vec<Paragraph>,
    used_ids: AHashSet<u64>,
    next_auto_id: u64,
    next_segment: u64,
    seen_content: bool,
}

impl<'c> Builder<'c> {
    fn new(cfg: &'c MarkupConfig) -> Self {
        Self {
            cfg,
            frames: Vec::new(),
            blocks: vec![BlockBuilder::new(None)],
            word: None,
            paragraphs: Vec::new(),
            used_ids: AHashSet::new(),
            next_auto_id: 0,
            next_segment: 0,
            seen_content: false,
        }
    }

    fn style(&self) -> SegmentStyle {
        self.frames.last().map(|f| f.style).unwrap_or_default()
    }

    fn skipping(&self) -> bool {
        self.frames.iter().any(|f| f.kind == FrameKind::Skip)
    }

    fn block(&mut self) -> &mut BlockBuilder {
        if self.blocks.is_empty() {
            self.blocks.push(BlockBuilder::new(None));
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    fn is_block_tag(&self, tag: &str) -> bool {
        self.cfg.block_tags.iter().any(|b| b.eq_ignore_ascii_case(tag))
    }

    /// Emit the current content of the innermost block. `closing` applies the
    /// empty paragraph rule; partial flushes only emit text.
    fn emit_block(&mut self, closing: bool) {
        let Some(block) = self.blocks.last_mut() else {
            return;
        };
        let segments = block.take_segments();
        let keep_empty = closing && !block.nested_blocks && self.seen_content;
        let explicit_id = block.id;
        if segments.is_empty() && !keep_empty {
            return;
        }
        let segments: Vec<Segment> = segments
            .into_iter()
            .map(|s| {
                let id = SegmentId(self.next_segment);
                self.next_segment += 1;
                s.with_id(id)
            })
            .collect();
        if segments.iter().any(|s| !s.text.trim().is_empty()) {
            self.seen_content = true;
        }
        let id = ParagraphId(self.assign_paragraph_id(explicit_id));
        self.paragraphs.push(Paragraph::new(id, segments));
    }

    /// Explicit ids win unless already taken; otherwise the lowest unused
    /// running index is assigned. Ids are unique within a document.
    fn assign_paragraph_id(&mut self, explicit: Option<u64>) -> u64 {
        if let Some(id) = explicit {
            if self.used_ids.insert(id) {
                return id;
            }
            debug!(target: "ingest", id, "duplicate_paragraph_id");
        }
        while self.used_ids.contains(&self.next_auto_id) {
            self.next_auto_id += 1;
        }
        let id = self.next_auto_id;
        self.used_ids.insert(id);
        self.next_auto_id += 1;
        id
    }

    fn text(&mut self, text: &str) {
        if self.skipping() || text.is_empty() {
            return;
        }
        let style = self.style();
        if let Some(word) = self.word.as_mut() {
            word.text.push_str(text);
            self.block().fallback.push_str(text);
            return;
        }
        let block = self.block();
        if block.run_style != style {
            block.flush_run();
            block.run_style = style;
        }
        block.run.push_str(text);
        block.fallback.push_str(text);
    }

    fn paragraph_id(&self, e: &BytesStart<'_>) -> Option<u64> {
        self.cfg
            .paragraph_id_attrs
            .iter()
            .find_map(|name| attr(e, name).and_then(|v| v.trim().parse::<u64>().ok()))
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
        if tag == "br" {
            self.text(" ");
            return;
        }
        if VOID_TAGS.contains(&tag.as_str()) {
            return;
        }
        let style = derive_style(self.style(), &tag, e);
        let kind = if SKIP_TAGS.contains(&tag.as_str()) {
            FrameKind::Skip
        } else if self.word.is_none() && self.is_word(e) {
            FrameKind::Word
        } else if self.is_block_tag(&tag) {
            FrameKind::Block
        } else {
            FrameKind::Inline
        };
        match kind {
            FrameKind::Block => {
                self.emit_block(false);
                self.block().nested_blocks = true;
                let id = self.paragraph_id(e);
                self.blocks.push(BlockBuilder::new(id));
            }
            FrameKind::Word => {
                self.word = Some(self.word_builder(e, style));
            }
            FrameKind::Inline | FrameKind::Skip => {}
        }
        self.frames.push(Frame { tag, kind, style });
        if empty {
            self.end_frame();
        }
    }

    fn end(&mut self, name: &[u8]) {
        let tag = String::from_utf8_lossy(name).to_ascii_lowercase();
        // Unmatched end tags are ignored; matched ones close everything above.
        let Some(pos) = self.frames.iter().rposition(|f| f.tag == tag) else {
            return;
        };
        while self.frames.len() > pos {
            self.end_frame();
        }
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        match frame.kind {
            FrameKind::Block => {
                self.emit_block(true);
                self.blocks.pop();
            }
            FrameKind::Word => {
                if let Some(word) = self.word.take() {
                    let segment = Segment {
                        id: SegmentId::default(),
                        text: collapse_html_whitespace(&word.text),
                        style: word.style,
                        is_interactive: word.interactive,
                        status: word.status,
                        term_id: word.term,
                        language_id: word.language,
                    };
                    let block = self.block();
                    block.flush_run();
                    block.segments.push(segment);
                    block.annotated = true;
                }
            }
            FrameKind::Inline | FrameKind::Skip => {}
        }
    }

    fn is_word(&self, e: &BytesStart<'_>) -> bool {
        attr(e, &self.cfg.term_attr).is_some() || class_status(e).is_some()
    }

    fn word_builder(&self, e: &BytesStart<'_>, style: SegmentStyle) -> WordBuilder {
        let term = attr(e, &self.cfg.term_attr)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(TermId)
            .unwrap_or(TermId::UNASSIGNED);
        let language = attr(e, &self.cfg.language_attr)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(self.cfg.default_language);
        WordBuilder {
            term,
            status: class_status(e).unwrap_or(Status::UNKNOWN),
            interactive: attr(e, &self.cfg.interactive_attr).is_some(),
            language: LanguageId(language),
            style,
            text: String::new(),
        }
    }

    /// Close whatever is still open (unterminated markup) and emit the rest.
    fn finish(mut self) -> Document {
        while !self.frames.is_empty() {
            self.end_frame();
        }
        self.emit_block(false);
        Document::new(self.paragraphs)
    }
}

/// Value of attribute `name` (case-insensitive); valueless attributes yield "".
fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.html_attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(name.as_bytes()))
        .map(|a| decode_entities(&String::from_utf8_lossy(&a.value)).into_owned())
}

fn class_status(e: &BytesStart<'_>) -> Option<Status> {
    attr(e, "class")?
        .split_whitespace()
        .find_map(Status::parse_class)
}

fn derive_style(parent: SegmentStyle, tag: &str, e: &BytesStart<'_>) -> SegmentStyle {
    let mut style = parent;
    match tag {
        "b" | "strong" => style.font_weight = SegmentStyle::BOLD_WEIGHT,
        "i" | "em" => style.is_italic = true,
        _ => {}
    }
    if let Some(css) = attr(e, "style") {
        for decl in css.split(';') {
            let Some((key, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "color" => {
                    if let Ok(color) = value.parse::<Color>() {
                        style.color = Some(color);
                    }
                }
                "font-weight" => match value {
                    "bold" | "bolder" => style.font_weight = SegmentStyle::BOLD_WEIGHT,
                    "normal" => style.font_weight = SegmentStyle::NORMAL_WEIGHT,
                    v => {
                        if let Ok(w) = v.parse::<u16>() {
                            style.font_weight = w;
                        }
                    }
                },
                "font-style" => style.is_italic = matches!(value, "italic" | "oblique"),
                _ => {}
            }
        }
    }
    style
}

/// Markup → `Document` converter configured by `[markup]`.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    cfg: MarkupConfig,
}

impl Ingestor {
    pub fn new(cfg: MarkupConfig) -> Self {
        Self { cfg }
    }

    /// Lenient parse: a markup error truncates the document (logged).
    pub fn parse(&self, src: &str) -> Document {
        let (doc, err) = self.run(src);
        if let Some(IngestError::Markup { position, message }) = err {
            warn!(
                target: "ingest",
                position,
                error = %message,
                paragraphs = doc.paragraph_count(),
                "markup_error_partial_document"
            );
        }
        doc
    }

    /// Like `parse` but a markup error is returned instead of a partial document.
    pub fn parse_strict(&self, src: &str) -> Result<Document, IngestError> {
        match self.run(src) {
            (_, Some(err)) => Err(err),
            (doc, None) => Ok(doc),
        }
    }

    fn run(&self, src: &str) -> (Document, Option<IngestError>) {
        let mut reader = Reader::from_str(src);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;
        let mut builder = Builder::new(&self.cfg);
        let mut error = None;
        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => builder.start(e, false),
                Ok(Event::Empty(ref e)) => builder.start(e, true),
                Ok(Event::End(ref e)) => builder.end(e.name().as_ref()),
                Ok(Event::Text(ref e)) => {
                    let raw = String::from_utf8_lossy(e);
                    builder.text(&decode_entities(&raw));
                }
                Ok(Event::CData(ref e)) => builder.text(&String::from_utf8_lossy(e)),
                Ok(Event::Eof) => break,
                Err(e) => {
                    error = Some(IngestError::Markup {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    });
                    break;
                }
                _ => {}
            }
        }
        let doc = builder.finish();
        debug!(
            target: "ingest",
            paragraphs = doc.paragraph_count(),
            segments = doc.segment_count(),
            bytes = src.len(),
            "ingest_complete"
        );
        (doc, error)
    }
}

/// Parse with the default markup contract.
pub fn parse(src: &str) -> Document {
    Ingestor::default().parse(src)
}
