//! Outbound logical events emitted by the reading surface.
//!
//! These are in-process callbacks only: no wire format. Gesture handling
//! produces `ReaderEvent`s and hands them to an `EventSink` supplied by the
//! host. Collaborators (dictionary lookup, sentence translation, status
//! editors) consume them and may later call back into the bulk updater.
//!
//! Ordering: for one resolved single tap the sink receives `SingleTap` and
//! then `WordTapped`; a double tap yields `DoubleTap` only.

use core_model::{LanguageId, SegmentId, TermId};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters; inspected by tests or logged periodically by hosts.
// -------------------------------------------------------------------------------------------------
pub static EVENTS_EMITTED: AtomicU64 = AtomicU64::new(0);
pub static SINK_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Identity used for tap disambiguation. Words sharing a term share timers;
/// unassigned words are keyed by their segment position instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Term(TermId),
    Segment(usize),
}

impl EntityKey {
    pub fn for_segment(term: TermId, segment_index: usize) -> Self {
        if term.is_assigned() {
            EntityKey::Term(term)
        } else {
            EntityKey::Segment(segment_index)
        }
    }
}

/// The word a tap resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct TapTarget {
    pub entity: EntityKey,
    pub segment_index: usize,
    pub segment_id: SegmentId,
    pub term_id: TermId,
    pub text: String,
    pub screen_x: f32,
    pub screen_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    WordTapped {
        term_id: TermId,
        text: String,
        screen_x: f32,
        screen_y: f32,
        segment_id: SegmentId,
    },
    SentenceLongPressed {
        sentence: String,
        language_id: LanguageId,
        screen_x: f32,
        screen_y: f32,
    },
    SingleTap(TapTarget),
    DoubleTap(TapTarget),
}

impl ReaderEvent {
    pub fn word_tapped(target: &TapTarget) -> Self {
        ReaderEvent::WordTapped {
            term_id: target.term_id,
            text: target.text.clone(),
            screen_x: target.screen_x,
            screen_y: target.screen_y,
            segment_id: target.segment_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReaderEvent::WordTapped { .. } => "word_tapped",
            ReaderEvent::SentenceLongPressed { .. } => "sentence_long_pressed",
            ReaderEvent::SingleTap(_) => "single_tap",
            ReaderEvent::DoubleTap(_) => "double_tap",
        }
    }
}

/// Receiver of reader events. Implementations must not block.
pub trait EventSink {
    fn emit(&mut self, event: ReaderEvent);
}

/// Count and trace an event before handing it to `sink`.
pub fn dispatch(sink: &mut dyn EventSink, event: ReaderEvent) {
    EVENTS_EMITTED.fetch_add(1, Ordering::Relaxed);
    trace!(target: "input.gesture", event = event.name(), "event_emitted");
    sink.emit(event);
}

/// Collects events in order; used by tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<ReaderEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events.
    pub fn take(&mut self) -> Vec<ReaderEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[ReaderEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: ReaderEvent) {
        self.events.push(event);
    }
}

/// Closure adapter.
pub struct FnSink<F: FnMut(ReaderEvent)>(pub F);

impl<F: FnMut(ReaderEvent)> EventSink for FnSink<F> {
    fn emit(&mut self, event: ReaderEvent) {
        (self.0)(event)
    }
}

/// Forward to an async runtime. A closed receiver drops the event.
impl EventSink for UnboundedSender<ReaderEvent> {
    fn emit(&mut self, event: ReaderEvent) {
        if self.send(event).is_err() {
            SINK_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            trace!(target: "input.gesture", "event_sink_closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn target() -> TapTarget {
        TapTarget {
            entity: EntityKey::Term(TermId(4)),
            segment_index: 2,
            segment_id: SegmentId(11),
            term_id: TermId(4),
            text: "mundo".to_string(),
            screen_x: 5.0,
            screen_y: 0.0,
        }
    }

    #[test]
    fn entity_key_falls_back_to_segment_for_unassigned_terms() {
        assert_eq!(EntityKey::for_segment(TermId(3), 9), EntityKey::Term(TermId(3)));
        assert_eq!(
            EntityKey::for_segment(TermId::UNASSIGNED, 9),
            EntityKey::Segment(9)
        );
    }

    #[test]
    fn word_tapped_copies_target_fields() {
        let ev = ReaderEvent::word_tapped(&target());
        assert_eq!(
            ev,
            ReaderEvent::WordTapped {
                term_id: TermId(4),
                text: "mundo".to_string(),
                screen_x: 5.0,
                screen_y: 0.0,
                segment_id: SegmentId(11),
            }
        );
        assert_eq!(ev.name(), "word_tapped");
    }

    #[test]
    fn recording_and_fn_sinks_receive_in_order() {
        let mut rec = RecordingSink::new();
        dispatch(&mut rec, ReaderEvent::SingleTap(target()));
        dispatch(&mut rec, ReaderEvent::word_tapped(&target()));
        let names: Vec<_> = rec.take().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["single_tap", "word_tapped"]);
        assert!(rec.is_empty());

        let mut seen = Vec::new();
        let mut sink = FnSink(|e: ReaderEvent| seen.push(e.name()));
        dispatch(&mut sink, ReaderEvent::DoubleTap(target()));
        drop(sink);
        assert_eq!(seen, vec!["double_tap"]);
    }

    #[tokio::test]
    async fn unbounded_sender_forwards_and_counts_failures() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<ReaderEvent>();
        dispatch(&mut tx, ReaderEvent::DoubleTap(target()));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("double_tap"));

        drop(rx);
        let before = SINK_SEND_FAILURES.load(Ordering::Relaxed);
        dispatch(&mut tx, ReaderEvent::DoubleTap(target()));
        assert!(SINK_SEND_FAILURES.load(Ordering::Relaxed) > before);
    }
}
