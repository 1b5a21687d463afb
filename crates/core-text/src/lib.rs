//! Flattening & indexing of paragraphs into one position-indexed buffer.
//!
//! Contract:
//! - Input: ordered `&[Paragraph]`.
//! - Output: `FlatText { buffer, segments }` where `buffer` is the concatenation
//!   of every segment's (tab-rewritten) text with exactly one
//!   `PARAGRAPH_SEPARATOR` between consecutive paragraphs, and `segments` is a
//!   flat, globally ordered `SegmentInfo` list mapping buffer ranges back to
//!   their source segment and paragraph.
//!
//! Offsets are UTF-8 byte offsets into `buffer` and always lie on char
//! boundaries. Tabs are rewritten to a single space before appending; both are
//! one byte, so the recorded range matches what layout will actually measure.
//!
//! Invariants (checked by `FlatText::check_invariants`, asserted in debug):
//! * Ranges are sorted by `start` and never overlap.
//! * Ranges inside one paragraph are contiguous.
//! * Every byte that is not a paragraph separator is covered by exactly one
//!   range; separators are covered by none.
//!
//! Lock-step rule: the buffer and the segment list are only ever built
//! together. The single mutation exposed afterwards (`set_status`) touches the
//! retained segment record and never moves a boundary.
//!
//! Logging policy: only sizes and counts are logged, never text content.

use core_model::{Paragraph, ParagraphId, Segment, Status};
use std::ops::Range;
use thiserror::Error;
use tracing::trace;

pub mod boundary;

/// Inserted between paragraphs; never covered by a `SegmentInfo`.
pub const PARAGRAPH_SEPARATOR: char = '\n';

/// Placement of one segment inside the flattened buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub start: usize, // inclusive byte offset
    pub end: usize,   // exclusive byte offset
    /// Retained copy of the source segment; `text` holds the rewritten text.
    pub segment: Segment,
    pub paragraph_id: ParagraphId,
}

impl SegmentInfo {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Half-open containment.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Non-empty intersection with `range`; an empty segment overlaps nothing.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        !self.is_empty() && self.start < range.end && range.start < self.end
    }
}

/// Programming defect detected in a `FlatText`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("segment {index} range {start}..{end} is inverted")]
    Inverted {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("segment {index} starts at {start} before previous end {previous_end}")]
    OutOfOrder {
        index: usize,
        start: usize,
        previous_end: usize,
    },
    #[error("segment {index} leaves gap {previous_end}..{start} inside a paragraph")]
    Gap {
        index: usize,
        start: usize,
        previous_end: usize,
    },
    #[error("segment {index} range {start}..{end} exceeds buffer len {len}")]
    OutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("segment {index} text does not match buffer slice")]
    TextMismatch { index: usize },
    #[error("byte {offset} is not covered by any segment")]
    Uncovered { offset: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatText {
    buffer: String,
    segments: Vec<SegmentInfo>,
    /// Byte offsets of inserted paragraph separators (sorted).
    separators: Vec<usize>,
}

/// Rewrite characters that do not render as visible whitespace.
pub fn normalize_segment_text(text: &str) -> String {
    text.replace('\t', " ")
}

/// Flatten paragraphs into one buffer and a position-sorted segment index.
pub fn flatten(paragraphs: &[Paragraph]) -> FlatText {
    let capacity: usize = paragraphs
        .iter()
        .flat_map(|p| p.segments.iter())
        .map(|s| s.text.len())
        .sum::<usize>()
        + paragraphs.len();
    let mut buffer = String::with_capacity(capacity);
    let mut segments = Vec::with_capacity(paragraphs.iter().map(|p| p.segments.len()).sum());
    let mut separators = Vec::with_capacity(paragraphs.len().saturating_sub(1));
    let mut offset = 0usize;

    for (p_index, paragraph) in paragraphs.iter().enumerate() {
        if p_index > 0 {
            separators.push(offset);
            buffer.push(PARAGRAPH_SEPARATOR);
            offset += PARAGRAPH_SEPARATOR.len_utf8();
        }
        for segment in &paragraph.segments {
            let text = normalize_segment_text(&segment.text);
            let start = offset;
            offset += text.len();
            buffer.push_str(&text);
            let mut retained = segment.clone();
            retained.text = text;
            segments.push(SegmentInfo {
                start,
                end: offset,
                segment: retained,
                paragraph_id: paragraph.id,
            });
        }
    }

    let flat = FlatText {
        buffer,
        segments,
        separators,
    };
    debug_assert_eq!(flat.check_invariants(), Ok(()));
    trace!(
        target: "text.flatten",
        paragraphs = paragraphs.len(),
        segments = flat.segments.len(),
        bytes = flat.buffer.len(),
        "flatten_complete"
    );
    flat
}

impl FlatText {
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn segments(&self) -> &[SegmentInfo] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&SegmentInfo> {
        self.segments.get(index)
    }

    /// Byte offsets of inserted paragraph separators.
    pub fn separators(&self) -> &[usize] {
        &self.separators
    }

    pub fn is_separator(&self, offset: usize) -> bool {
        self.separators.binary_search(&offset).is_ok()
    }

    /// Buffer slice for `range`, `None` when out of bounds or not on char boundaries.
    pub fn slice(&self, range: Range<usize>) -> Option<&str> {
        self.buffer.get(range)
    }

    /// Segment containing `offset` (binary search). Empty segments never match.
    pub fn segment_at(&self, offset: usize) -> Option<(usize, &SegmentInfo)> {
        let idx = self.segments.partition_point(|s| s.end <= offset);
        self.segments
            .get(idx)
            .filter(|s| s.contains(offset))
            .map(|s| (idx, s))
    }

    /// Segments whose range overlaps `range`, in buffer order.
    pub fn segments_overlapping(
        &self,
        range: Range<usize>,
    ) -> impl Iterator<Item = (usize, &SegmentInfo)> {
        let first = self.segments.partition_point(|s| s.end <= range.start);
        let end = range.end;
        self.segments[first..]
            .iter()
            .enumerate()
            .map(move |(i, s)| (first + i, s))
            .take_while(move |(_, s)| s.start < end)
            .filter(move |(_, s)| s.overlaps(&range))
    }

    /// Buffer range of each paragraph, in order (separators excluded).
    pub fn paragraph_ranges(&self) -> Vec<(ParagraphId, Range<usize>)> {
        let mut out: Vec<(ParagraphId, Range<usize>)> = Vec::new();
        for info in &self.segments {
            match out.last_mut() {
                Some((id, r)) if *id == info.paragraph_id && r.end == info.start => {
                    r.end = info.end;
                }
                _ => out.push((info.paragraph_id, info.range())),
            }
        }
        out
    }

    /// Write `status` into the retained segment record. Boundaries are untouched.
    /// Returns the previous status, `None` when `index` is out of range.
    pub fn set_status(&mut self, index: usize, status: Status) -> Option<Status> {
        let info = self.segments.get_mut(index)?;
        let previous = info.segment.status;
        info.segment.status = status;
        Some(previous)
    }

    fn separators_between(&self, range: Range<usize>) -> bool {
        let first = self.separators.partition_point(|&s| s < range.start);
        self.separators.get(first).is_some_and(|&s| s < range.end)
    }

    /// Verify the lock-step invariants between buffer and segment index.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let len = self.buffer.len();
        let mut previous: Option<&SegmentInfo> = None;
        for (index, info) in self.segments.iter().enumerate() {
            if info.start > info.end {
                return Err(InvariantViolation::Inverted {
                    index,
                    start: info.start,
                    end: info.end,
                });
            }
            if info.end > len {
                return Err(InvariantViolation::OutOfBounds {
                    index,
                    start: info.start,
                    end: info.end,
                    len,
                });
            }
            if let Some(prev) = previous {
                if info.start < prev.end {
                    return Err(InvariantViolation::OutOfOrder {
                        index,
                        start: info.start,
                        previous_end: prev.end,
                    });
                }
                let separated = self.separators_between(prev.end..info.start);
                if !separated && info.start != prev.end {
                    return Err(InvariantViolation::Gap {
                        index,
                        start: info.start,
                        previous_end: prev.end,
                    });
                }
            }
            if self.buffer.get(info.range()) != Some(info.segment.text.as_str()) {
                return Err(InvariantViolation::TextMismatch { index });
            }
            previous = Some(info);
        }
        // Coverage: walk the buffer, every non-separator byte must be inside a range.
        let mut cursor = 0usize;
        let mut seps = self.separators.iter().peekable();
        for info in &self.segments {
            while cursor < info.start {
                if seps.peek() == Some(&&cursor) {
                    seps.next();
                    cursor += PARAGRAPH_SEPARATOR.len_utf8();
                } else {
                    return Err(InvariantViolation::Uncovered { offset: cursor });
                }
            }
            cursor = cursor.max(info.end);
        }
        while cursor < len {
            if seps.peek() == Some(&&cursor) {
                seps.next();
                cursor += PARAGRAPH_SEPARATOR.len_utf8();
            } else {
                return Err(InvariantViolation::Uncovered { offset: cursor });
            }
        }
        Ok(())
    }
}
