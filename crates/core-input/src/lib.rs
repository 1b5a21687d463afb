//! Gesture disambiguation over the flattened reading buffer.
//!
//! Flow for one pointer interaction:
//! - `TapDown`: hit-test the nearest buffer offset and remember it together
//!   with its on-screen position, for a possible long press.
//! - `TapUp`: hit-test, expand to the surrounding letters, resolve to an
//!   interactive segment (exact text + range first, then containing text +
//!   overlapping range), then disambiguate single vs double per entity.
//! - `LongPress`: extract the sentence around the remembered offset and emit
//!   it with the remembered screen position. Independent of tap timers.
//!
//! Single vs double: a second tap on the same entity within the window
//! cancels the pending single and dispatches `DoubleTap` immediately;
//! otherwise a single is scheduled for `now + window`. Pending singles fire
//! from `poll` (every handler polls first), as `SingleTap` then `WordTapped`.
//!
//! Failure policy: no layout yet → every handler is a no-op; no matching
//! segment → no event. Both are logged at trace under `input.gesture`.

mod gesture;
mod timers;

pub use gesture::{Gesture, GestureClassifier, TouchEvent, TouchPhase};
pub use timers::TapTimers;

use ahash::AHashMap;
use core_config::GestureConfig;
use core_events::{EntityKey, EventSink, ReaderEvent, TapTarget, dispatch};
use core_model::LanguageId;
use core_render::TextLayout;
use core_text::boundary::{sentence_at, word_range};
use core_text::{FlatText, SegmentInfo};
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::trace;

/// What a handler needs to hit-test: the buffer, its layout (absent until the
/// surface is measured) and the surface origin on screen.
#[derive(Clone, Copy)]
pub struct HitContext<'a> {
    pub text: &'a FlatText,
    pub layout: Option<&'a dyn TextLayout>,
    pub origin: (f32, f32),
}

impl<'a> HitContext<'a> {
    pub fn new(text: &'a FlatText, layout: Option<&'a dyn TextLayout>) -> Self {
        Self {
            text,
            layout,
            origin: (0.0, 0.0),
        }
    }

    pub fn with_origin(mut self, x: f32, y: f32) -> Self {
        self.origin = (x, y);
        self
    }

    fn screen_position(&self, layout: &dyn TextLayout, offset: usize) -> (f32, f32) {
        let (x, y) = layout.position_of(offset);
        (x + self.origin.0, y + self.origin.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PressAnchor {
    offset: usize,
    screen_x: f32,
    screen_y: f32,
}

/// Resolve a tapped word range to an interactive segment.
pub fn resolve_word<'a>(flat: &'a FlatText, range: Range<usize>) -> Option<(usize, &'a SegmentInfo)> {
    let word = flat.slice(range.clone()).filter(|w| !w.is_empty())?;
    let mut fallback = None;
    for (index, info) in flat.segments_overlapping(range.clone()) {
        if !info.segment.is_interactive {
            continue;
        }
        if info.range() == range && info.segment.text == word {
            return Some((index, info));
        }
        if fallback.is_none() && info.segment.text.contains(word) {
            fallback = Some((index, info));
        }
    }
    fallback
}

#[derive(Debug)]
pub struct GestureDisambiguator {
    window: Duration,
    timers: TapTimers<EntityKey, TapTarget>,
    last_tap: AHashMap<EntityKey, Instant>,
    anchor: Option<PressAnchor>,
}

impl GestureDisambiguator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timers: TapTimers::new(),
            last_tap: AHashMap::new(),
            anchor: None,
        }
    }

    pub fn from_config(cfg: &GestureConfig) -> Self {
        Self::new(cfg.double_tap_window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Earliest pending single-tap deadline, for hosts that sleep between polls.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn has_pending(&self, entity: &EntityKey) -> bool {
        self.timers.is_pending(entity)
    }

    /// Dispatch every single tap whose window elapsed by `now`.
    pub fn poll(&mut self, now: Instant, sink: &mut dyn EventSink) {
        for (_, target) in self.timers.poll(now) {
            dispatch(sink, ReaderEvent::SingleTap(target.clone()));
            dispatch(sink, ReaderEvent::word_tapped(&target));
        }
        let window = self.window;
        self.last_tap
            .retain(|_, at| now.saturating_duration_since(*at) < window);
    }

    pub fn handle(
        &mut self,
        ctx: &HitContext<'_>,
        gesture: Gesture,
        now: Instant,
        sink: &mut dyn EventSink,
    ) {
        match gesture {
            Gesture::TapDown { x, y } => self.tap_down(ctx, x, y, now, sink),
            Gesture::TapUp { x, y } => self.tap_up(ctx, x, y, now, sink),
            Gesture::LongPress { .. } => self.long_press(ctx, now, sink),
        }
    }

    pub fn tap_down(
        &mut self,
        ctx: &HitContext<'_>,
        x: f32,
        y: f32,
        now: Instant,
        sink: &mut dyn EventSink,
    ) {
        self.poll(now, sink);
        let Some(layout) = ctx.layout else {
            trace!(target: "input.gesture", "tap_down_without_layout");
            self.anchor = None;
            return;
        };
        let offset = layout.offset_at(x, y);
        let (screen_x, screen_y) = ctx.screen_position(layout, offset);
        self.anchor = Some(PressAnchor {
            offset,
            screen_x,
            screen_y,
        });
    }

    pub fn tap_up(
        &mut self,
        ctx: &HitContext<'_>,
        x: f32,
        y: f32,
        now: Instant,
        sink: &mut dyn EventSink,
    ) {
        self.poll(now, sink);
        let Some(layout) = ctx.layout else {
            trace!(target: "input.gesture", "tap_up_without_layout");
            return;
        };
        let offset = layout.offset_at(x, y);
        let range = word_range(ctx.text.buffer(), offset);
        let Some((index, info)) = resolve_word(ctx.text, range) else {
            trace!(target: "input.gesture", offset, "tap_lookup_miss");
            return;
        };
        let (screen_x, screen_y) = ctx.screen_position(layout, info.start);
        let entity = EntityKey::for_segment(info.segment.term_id, index);
        let target = TapTarget {
            entity,
            segment_index: index,
            segment_id: info.segment.id,
            term_id: info.segment.term_id,
            text: info.segment.text.clone(),
            screen_x,
            screen_y,
        };
        let recent = self
            .last_tap
            .get(&entity)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.window);
        if recent {
            self.timers.cancel(&entity);
            self.last_tap.remove(&entity);
            trace!(target: "input.gesture", segment = index, "double_tap");
            dispatch(sink, ReaderEvent::DoubleTap(target));
        } else {
            self.last_tap.insert(entity, now);
            self.timers.schedule(entity, now + self.window, target);
            trace!(target: "input.gesture", segment = index, "single_tap_scheduled");
        }
    }

    /// Emit the sentence around the offset recorded at the last tap-down.
    pub fn long_press(&mut self, ctx: &HitContext<'_>, now: Instant, sink: &mut dyn EventSink) {
        self.poll(now, sink);
        let Some(anchor) = self.anchor else {
            trace!(target: "input.gesture", "long_press_without_anchor");
            return;
        };
        let sentence = sentence_at(ctx.text.buffer(), anchor.offset);
        if sentence.is_empty() {
            trace!(target: "input.gesture", offset = anchor.offset, "long_press_empty_sentence");
            return;
        }
        let language_id = language_near(ctx.text, anchor.offset);
        dispatch(
            sink,
            ReaderEvent::SentenceLongPressed {
                sentence,
                language_id,
                screen_x: anchor.screen_x,
                screen_y: anchor.screen_y,
            },
        );
    }
}

/// Language of the segment at `offset`, else of the closest segment before it.
fn language_near(flat: &FlatText, offset: usize) -> LanguageId {
    if let Some((_, info)) = flat.segment_at(offset) {
        return info.segment.language_id;
    }
    let before = flat.segments().partition_point(|s| s.start < offset);
    flat.segments()[..before]
        .last()
        .or_else(|| flat.segments().first())
        .map(|info| info.segment.language_id)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::RecordingSink;
    use core_model::{Paragraph, ParagraphId, Segment, SegmentId, Status, TermId};
    use core_render::GridLayout;
    use core_text::flatten;

    fn hola_mundo() -> FlatText {
        flatten(&[Paragraph::new(
            ParagraphId(0),
            vec![
                Segment::term("Hola", TermId(1), Status::UNKNOWN).with_id(SegmentId(0)),
                Segment::plain(" ").with_id(SegmentId(1)),
                Segment::term("mundo", TermId(2), Status(3)).with_id(SegmentId(2)),
            ],
        )])
    }

    #[test]
    fn resolve_prefers_exact_match() {
        let flat = hola_mundo();
        assert_eq!(resolve_word(&flat, 5..10).map(|(i, _)| i), Some(2));
        assert_eq!(resolve_word(&flat, 0..4).map(|(i, _)| i), Some(0));
        assert!(resolve_word(&flat, 4..4).is_none());
        assert!(resolve_word(&flat, 4..5).is_none(), "space is not interactive");
    }

    #[test]
    fn resolve_falls_back_to_containing_segment() {
        // Word chars stop at the apostrophe; the segment holds the whole token.
        let flat = flatten(&[Paragraph::new(
            ParagraphId(0),
            vec![Segment::term("l'eau", TermId(3), Status(1))],
        )]);
        let range = word_range(flat.buffer(), 3);
        assert_eq!(range, 2..5);
        assert_eq!(resolve_word(&flat, range).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn handlers_are_noops_without_layout() {
        let flat = hola_mundo();
        let ctx = HitContext::new(&flat, None);
        let mut d = GestureDisambiguator::new(Duration::from_millis(200));
        let mut sink = RecordingSink::new();
        let t0 = Instant::now();
        d.tap_down(&ctx, 1.0, 0.0, t0, &mut sink);
        d.tap_up(&ctx, 1.0, 0.0, t0, &mut sink);
        d.long_press(&ctx, t0, &mut sink);
        d.poll(t0 + Duration::from_secs(1), &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn screen_coordinates_include_origin() {
        let flat = hola_mundo();
        let grid = GridLayout::with_cell_size(flat.buffer(), 80, 10.0, 20.0);
        let ctx = HitContext::new(&flat, Some(&grid)).with_origin(100.0, 50.0);
        let mut d = GestureDisambiguator::new(Duration::from_millis(200));
        let mut sink = RecordingSink::new();
        let t0 = Instant::now();
        d.tap_up(&ctx, 72.0, 5.0, t0, &mut sink);
        d.poll(t0 + Duration::from_millis(200), &mut sink);
        assert_eq!(
            sink.events().last(),
            Some(&ReaderEvent::WordTapped {
                term_id: TermId(2),
                text: "mundo".to_string(),
                screen_x: 150.0,
                screen_y: 50.0,
                segment_id: SegmentId(2),
            })
        );
    }

    #[test]
    fn language_lookup_uses_neighbouring_segment() {
        let flat = flatten(&[
            Paragraph::new(
                ParagraphId(0),
                vec![Segment::plain("Uno.").with_language(LanguageId(4))],
            ),
            Paragraph::new(ParagraphId(1), vec![]),
        ]);
        assert_eq!(language_near(&flat, 1), LanguageId(4));
        assert_eq!(language_near(&flat, 4), LanguageId(4));
        assert_eq!(language_near(&flatten(&[]), 0), LanguageId::default());
    }
}
