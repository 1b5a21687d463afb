//! Raw pointer events → tap / long-press gestures.
//!
//! A press becomes `TapDown` immediately. Releasing it yields `TapUp` unless
//! the pointer wandered farther than the touch slop or a long press already
//! fired. Long presses are detected by `poll` while the pointer is still down,
//! so the host must poll at least once after the threshold elapses.

use core_config::GestureConfig;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
    pub at: Instant,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, x: f32, y: f32, at: Instant) -> Self {
        Self { phase, x, y, at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    TapDown { x: f32, y: f32 },
    TapUp { x: f32, y: f32 },
    LongPress { x: f32, y: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    x: f32,
    y: f32,
    at: Instant,
    moved: bool,
    long_fired: bool,
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    long_press: Duration,
    slop: f32,
    press: Option<Press>,
}

impl GestureClassifier {
    pub fn new(long_press: Duration, slop: f32) -> Self {
        Self {
            long_press,
            slop,
            press: None,
        }
    }

    pub fn from_config(cfg: &GestureConfig) -> Self {
        Self::new(cfg.long_press_threshold(), cfg.touch_slop)
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    pub fn on_touch(&mut self, ev: TouchEvent) -> Option<Gesture> {
        match ev.phase {
            TouchPhase::Down => {
                self.press = Some(Press {
                    x: ev.x,
                    y: ev.y,
                    at: ev.at,
                    moved: false,
                    long_fired: false,
                });
                Some(Gesture::TapDown { x: ev.x, y: ev.y })
            }
            TouchPhase::Move => {
                if let Some(p) = self.press.as_mut() {
                    let (dx, dy) = (ev.x - p.x, ev.y - p.y);
                    if dx * dx + dy * dy > self.slop * self.slop {
                        p.moved = true;
                    }
                }
                None
            }
            TouchPhase::Up => {
                // A long press that was never polled still wins over a tap.
                if let Some(g) = self.poll(ev.at) {
                    self.press = None;
                    return Some(g);
                }
                let p = self.press.take()?;
                (!p.moved && !p.long_fired).then_some(Gesture::TapUp { x: ev.x, y: ev.y })
            }
            TouchPhase::Cancel => {
                self.press = None;
                None
            }
        }
    }

    /// Fire a long press once the pointer has been held still long enough.
    pub fn poll(&mut self, now: Instant) -> Option<Gesture> {
        let p = self.press.as_mut()?;
        if p.moved || p.long_fired || now.duration_since(p.at) < self.long_press {
            return None;
        }
        p.long_fired = true;
        Some(Gesture::LongPress { x: p.x, y: p.y })
    }
}
