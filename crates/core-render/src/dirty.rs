//! Dirty range tracking.
//!
//! Records buffer byte ranges whose decorations changed since the surface was
//! last refreshed. The updater marks each recomputed segment range; the refresh
//! path consumes the set once and hands it to `RenderSurface::invalidate`.
//!
//! Design constraints:
//! * Overlapping or touching marks are merged lazily when `take` is called.
//! * Not thread-safe (mutably borrowed from the single UI thread).
//!
//! Invariants:
//! * Ranges returned from `take` are sorted, non-empty and pairwise disjoint
//!   with gaps between them.
//! * After `take`, internal storage is cleared (one-shot consumption).

use std::ops::Range;

#[derive(Debug, Default)]
pub struct DirtyRanges {
    ranges: Vec<Range<usize>>,
}

impl DirtyRanges {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Mark a half-open range as dirty. Empty ranges are ignored.
    pub fn mark(&mut self, range: Range<usize>) {
        if range.start < range.end {
            self.ranges.push(range);
        }
    }

    /// Consume and return the merged dirty set.
    pub fn take(&mut self) -> Vec<Range<usize>> {
        let mut v: Vec<Range<usize>> = self.ranges.drain(..).collect();
        v.sort_unstable_by_key(|r| (r.start, r.end));
        let mut out: Vec<Range<usize>> = Vec::with_capacity(v.len());
        for r in v {
            match out.last_mut() {
                Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
                _ => out.push(r),
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_take_merges() {
        let mut d = DirtyRanges::new();
        d.mark(20..25);
        d.mark(5..10);
        d.mark(8..12);
        d.mark(12..14);
        d.mark(3..3);
        assert_eq!(d.take(), vec![5..14, 20..25]);
        assert!(d.is_empty());
    }

    #[test]
    fn empty_after_clear() {
        let mut d = DirtyRanges::new();
        d.mark(0..4);
        d.clear();
        assert!(d.is_empty());
        assert!(d.take().is_empty());
    }
}
