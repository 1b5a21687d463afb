use core_events::{EntityKey, ReaderEvent, RecordingSink};
use core_input::{
    Gesture, GestureClassifier, GestureDisambiguator, HitContext, TouchEvent, TouchPhase,
};
use core_model::{LanguageId, Paragraph, ParagraphId, Segment, SegmentId, Status, TermId};
use core_render::GridLayout;
use core_text::{FlatText, flatten};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(200);

fn text() -> FlatText {
    flatten(&[
        Paragraph::new(
            ParagraphId(0),
            vec![
                Segment::term("Hi", TermId(1), Status::UNKNOWN),
                Segment::plain(" "),
                Segment::term("there", TermId(2), Status(1)),
                Segment::plain(". "),
                Segment::term("How", TermId(3), Status(2)).with_language(LanguageId(7)),
                Segment::plain(" "),
                Segment::term("are", TermId(4), Status::UNKNOWN),
                Segment::plain(" "),
                Segment::term("you", TermId(5), Status::UNKNOWN),
                Segment::plain("?"),
            ],
        ),
        Paragraph::new(
            ParagraphId(1),
            vec![
                Segment::term("there", TermId(2), Status(1)).with_id(SegmentId(42)),
            ],
        ),
    ])
}

fn names(sink: &mut RecordingSink) -> Vec<&'static str> {
    sink.take().iter().map(|e| e.name()).collect()
}

/// Tap the cell at `col` of `row` in a one-unit grid.
fn tap(
    d: &mut GestureDisambiguator,
    ctx: &HitContext<'_>,
    col: f32,
    row: f32,
    at: Instant,
    sink: &mut RecordingSink,
) {
    d.handle(ctx, Gesture::TapDown { x: col, y: row }, at, sink);
    d.handle(ctx, Gesture::TapUp { x: col, y: row }, at, sink);
}

#[test]
fn two_taps_within_window_yield_one_double_and_no_single() {
    let flat = text();
    let grid = GridLayout::new(flat.buffer(), 80);
    let ctx = HitContext::new(&flat, Some(&grid));
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    tap(&mut d, &ctx, 4.0, 0.0, t0, &mut sink);
    assert!(d.has_pending(&EntityKey::Term(TermId(2))));
    tap(&mut d, &ctx, 5.0, 0.0, t0 + Duration::from_millis(120), &mut sink);
    d.poll(t0 + Duration::from_secs(2), &mut sink);

    assert_eq!(names(&mut sink), vec!["double_tap"]);
    assert!(!d.has_pending(&EntityKey::Term(TermId(2))));
}

#[test]
fn two_taps_beyond_window_yield_two_singles() {
    let flat = text();
    let grid = GridLayout::new(flat.buffer(), 80);
    let ctx = HitContext::new(&flat, Some(&grid));
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    tap(&mut d, &ctx, 4.0, 0.0, t0, &mut sink);
    tap(&mut d, &ctx, 4.0, 0.0, t0 + Duration::from_millis(350), &mut sink);
    d.poll(t0 + Duration::from_secs(2), &mut sink);

    assert_eq!(
        names(&mut sink),
        vec!["single_tap", "word_tapped", "single_tap", "word_tapped"]
    );
}

#[test]
fn same_term_in_another_paragraph_shares_the_entity() {
    let flat = text();
    let grid = GridLayout::new(flat.buffer(), 80);
    let ctx = HitContext::new(&flat, Some(&grid));
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    tap(&mut d, &ctx, 4.0, 0.0, t0, &mut sink);
    tap(&mut d, &ctx, 1.0, 1.0, t0 + Duration::from_millis(50), &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ReaderEvent::DoubleTap(target) => {
            assert_eq!(target.segment_id, SegmentId(42));
            assert_eq!(target.entity, EntityKey::Term(TermId(2)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn taps_on_different_entities_do_not_pair() {
    let flat = text();
    let grid = GridLayout::new(flat.buffer(), 80);
    let ctx = HitContext::new(&flat, Some(&grid));
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    tap(&mut d, &ctx, 0.0, 0.0, t0, &mut sink);
    tap(&mut d, &ctx, 11.0, 0.0, t0 + Duration::from_millis(10), &mut sink);
    d.poll(t0 + Duration::from_millis(210), &mut sink);

    let texts: Vec<String> = sink
        .take()
        .into_iter()
        .filter_map(|e| match e {
            ReaderEvent::WordTapped { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["Hi".to_string(), "How".to_string()]);
}

#[test]
fn tap_on_punctuation_or_separator_emits_nothing() {
    let flat = text();
    let grid = GridLayout::new(flat.buffer(), 80);
    let ctx = HitContext::new(&flat, Some(&grid));
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    tap(&mut d, &ctx, 9.0, 0.0, t0, &mut sink); // space after '.'
    tap(&mut d, &ctx, 40.0, 0.0, t0, &mut sink); // past the row end, after '?'
    d.poll(t0 + Duration::from_secs(1), &mut sink);
    assert!(sink.is_empty());
}

#[test]
fn long_press_emits_sentence_with_recorded_position() {
    let flat = text();
    let grid = GridLayout::with_cell_size(flat.buffer(), 80, 10.0, 20.0);
    let ctx = HitContext::new(&flat, Some(&grid)).with_origin(5.0, 5.0);
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    d.handle(&ctx, Gesture::TapDown { x: 125.0, y: 3.0 }, t0, &mut sink);
    d.handle(&ctx, Gesture::LongPress { x: 125.0, y: 3.0 }, t0, &mut sink);

    assert_eq!(
        sink.take(),
        vec![ReaderEvent::SentenceLongPressed {
            sentence: "How are you?".to_string(),
            language_id: LanguageId(7),
            screen_x: 125.0,
            screen_y: 5.0,
        }]
    );
}

#[test]
fn classifier_feeds_disambiguator() {
    let flat = text();
    let grid = GridLayout::new(flat.buffer(), 80);
    let ctx = HitContext::new(&flat, Some(&grid));
    let mut classifier = GestureClassifier::new(Duration::from_millis(500), 8.0);
    let mut d = GestureDisambiguator::new(WINDOW);
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    let touches = [
        TouchEvent::new(TouchPhase::Down, 19.0, 0.0, t0),
        TouchEvent::new(TouchPhase::Up, 19.0, 0.0, t0 + Duration::from_millis(60)),
    ];
    for touch in touches {
        if let Some(g) = classifier.on_touch(touch) {
            d.handle(&ctx, g, touch.at, &mut sink);
        }
    }
    d.poll(t0 + Duration::from_millis(400), &mut sink);
    let events = sink.take();
    assert!(matches!(
        events.last(),
        Some(ReaderEvent::WordTapped { text, .. }) if text == "you"
    ));
}

proptest! {
    #[test]
    fn disambiguation_timing(gap_ms in 0u64..600) {
        let flat = text();
        let grid = GridLayout::new(flat.buffer(), 80);
        let ctx = HitContext::new(&flat, Some(&grid));
        let mut d = GestureDisambiguator::new(WINDOW);
        let mut sink = RecordingSink::new();
        let t0 = Instant::now();

        tap(&mut d, &ctx, 12.0, 0.0, t0, &mut sink);
        tap(&mut d, &ctx, 12.0, 0.0, t0 + Duration::from_millis(gap_ms), &mut sink);
        d.poll(t0 + Duration::from_secs(5), &mut sink);

        let events = sink.take();
        let doubles = events.iter().filter(|e| matches!(e, ReaderEvent::DoubleTap(_))).count();
        let singles = events.iter().filter(|e| matches!(e, ReaderEvent::SingleTap(_))).count();
        if Duration::from_millis(gap_ms) < WINDOW {
            prop_assert_eq!((doubles, singles), (1, 0));
        } else {
            prop_assert_eq!((doubles, singles), (0, 2));
        }
    }
}
