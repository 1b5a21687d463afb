//! Reader state: the retained flattened buffer, its decorations, and the bulk
//! status updater.
//!
//! Ownership:
//! - `ReaderState` owns the `FlatText` built from one ingestion and the
//!   `DecorationLayer` derived from it. Both are rebuilt together by `new`;
//!   afterward only statuses and color decorations change.
//! - A term index (`TermId` → segment indices) is built once. It lists every
//!   occurrence of a term, which may be scattered across paragraphs.
//!
//! Update contract (`update` / `update_many`):
//! - For every segment with the term: remove foreground and background
//!   decorations lying inside the segment range, recompute them for the new
//!   status, and write the status into the retained segment record.
//! - Emphasis decorations are untouched. Segments of other terms are
//!   untouched, so updates are local.
//! - Repeating an update yields the same decoration layer (idempotent).
//! - Afterward the surface is force-refreshed once, with the touched ranges
//!   as the dirty set.
//! - `TermId::UNASSIGNED` groups unrelated words and is never updated.
//!
//! Telemetry: `status_update` trace events under target `state.update` carry
//! the term id, status and number of segments touched.

use ahash::AHashMap;
use core_model::{Paragraph, Status, TermId};
use core_render::{
    DecorationEngine, DecorationLayer, DirtyRanges, Layers, RenderSurface, RenderedText,
    force_refresh,
};
use core_text::{FlatText, flatten};
use smallvec::SmallVec;
use tracing::debug;

pub type Occurrences = SmallVec<[usize; 4]>;

/// Outcome of updating one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub term: TermId,
    pub status: Status,
    pub segments_updated: usize,
}

#[derive(Debug)]
pub struct ReaderState {
    flat: FlatText,
    layer: DecorationLayer,
    engine: DecorationEngine,
    terms: AHashMap<TermId, Occurrences>,
    dirty: DirtyRanges,
}

impl ReaderState {
    pub fn new(paragraphs: &[Paragraph], engine: DecorationEngine) -> Self {
        Self::from_flat(flatten(paragraphs), engine)
    }

    pub fn from_flat(flat: FlatText, engine: DecorationEngine) -> Self {
        let layer = engine.decorate(&flat);
        let mut terms: AHashMap<TermId, Occurrences> = AHashMap::new();
        for (index, info) in flat.segments().iter().enumerate() {
            let term = info.segment.term_id;
            if term.is_assigned() {
                terms.entry(term).or_default().push(index);
            }
        }
        debug!(
            target: "state.update",
            segments = flat.segments().len(),
            terms = terms.len(),
            "reader_state_built"
        );
        Self {
            flat,
            layer,
            engine,
            terms,
            dirty: DirtyRanges::new(),
        }
    }

    pub fn flat(&self) -> &FlatText {
        &self.flat
    }

    pub fn layer(&self) -> &DecorationLayer {
        &self.layer
    }

    pub fn engine(&self) -> &DecorationEngine {
        &self.engine
    }

    pub fn rendered(&self) -> RenderedText<'_> {
        RenderedText::new(self.flat.buffer(), &self.layer)
    }

    /// Segment indices carrying `term`, in buffer order.
    pub fn occurrences(&self, term: TermId) -> &[usize] {
        self.terms.get(&term).map(|o| o.as_slice()).unwrap_or(&[])
    }

    /// Current status of `term` (taken from its first occurrence).
    pub fn status_of(&self, term: TermId) -> Option<Status> {
        let first = *self.occurrences(term).first()?;
        self.flat.segment(first).map(|info| info.segment.status)
    }

    /// Current `(term, status)` annotation state, ordered by term id.
    pub fn annotations(&self) -> Vec<(TermId, Status)> {
        let mut out: Vec<(TermId, Status)> = self
            .terms
            .keys()
            .filter_map(|&term| self.status_of(term).map(|s| (term, s)))
            .collect();
        out.sort_unstable_by_key(|(term, _)| *term);
        out
    }

    /// Recompute decorations and retained status for every occurrence of
    /// `term` without touching the surface. Dirty ranges accumulate until the
    /// next `refresh`.
    pub fn apply_status(&mut self, term: TermId, status: Status) -> UpdateReport {
        if !term.is_assigned() {
            debug!(target: "state.update", status = status.raw(), "unassigned_term_ignored");
            return UpdateReport {
                term,
                status,
                segments_updated: 0,
            };
        }
        let indices: Occurrences = self.terms.get(&term).cloned().unwrap_or_default();
        for &index in &indices {
            let Some(info) = self.flat.segment(index) else {
                continue;
            };
            let range = info.range();
            let decorations = self.engine.color_decorations(info, status);
            self.layer.remove_within(range.clone(), Layers::COLORS);
            self.layer.extend(decorations);
            self.flat.set_status(index, status);
            self.dirty.mark(range);
        }
        debug!(
            target: "state.update",
            term = term.0,
            status = status.raw(),
            segments = indices.len(),
            "status_update"
        );
        UpdateReport {
            term,
            status,
            segments_updated: indices.len(),
        }
    }

    /// Push the current buffer to `surface` if anything changed since the last refresh.
    pub fn refresh(&mut self, surface: &mut dyn RenderSurface) -> bool {
        if self.dirty.is_empty() {
            return false;
        }
        let dirty = self.dirty.take();
        let rendered = RenderedText::new(self.flat.buffer(), &self.layer);
        force_refresh(surface, &rendered, &dirty);
        true
    }

    pub fn update(
        &mut self,
        term: TermId,
        status: Status,
        surface: &mut dyn RenderSurface,
    ) -> UpdateReport {
        let report = self.apply_status(term, status);
        self.refresh(surface);
        report
    }

    /// Batch form: every pair is applied, then the surface refreshes once.
    pub fn update_many<I>(&mut self, updates: I, surface: &mut dyn RenderSurface) -> Vec<UpdateReport>
    where
        I: IntoIterator<Item = (TermId, Status)>,
    {
        let reports: Vec<UpdateReport> = updates
            .into_iter()
            .map(|(term, status)| self.apply_status(term, status))
            .collect();
        self.refresh(surface);
        reports
    }
}
