//! Rendering surface invalidation API.
//!
//! Some hosts do not notice that decorations on an already displayed buffer
//! changed, so a refresh is explicit and has three steps (`force_refresh`):
//!
//! 1. reassign the rendered buffer to the surface (`set_text`),
//! 2. invalidate the dirty ranges and request a layout pass,
//! 3. when the surface sits inside a scroll container that suppresses repaint
//!    while idle, nudge the scroll offset by one unit and back
//!    (`ScrollHost::force_repaint`).
//!
//! Scroll containers are composed, not subclassed: `ScrollHost` owns a
//! `Scrollable` and mediates every programmatic scroll through a
//! `ScrollPolicy`. A policy that blocks programmatic scrolling is lifted only
//! for the duration of the nudge and restored afterward.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::decorate::RenderedText;

// Telemetry: relaxed counters, inspected by tests and diagnostics.
pub static FORCED_REFRESHES: AtomicU64 = AtomicU64::new(0);
pub static SCROLL_NUDGES: AtomicU64 = AtomicU64::new(0);
pub static BLOCKED_SCROLLS: AtomicU64 = AtomicU64::new(0);

/// The raw scrollable primitive (vertical offset in surface units).
pub trait Scrollable {
    fn scroll_offset(&self) -> i32;
    fn set_scroll_offset(&mut self, offset: i32);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollPolicy {
    /// Refuse scroll requests that do not originate from the user.
    pub block_programmatic: bool,
}

pub struct ScrollHost {
    inner: Box<dyn Scrollable>,
    policy: ScrollPolicy,
}

impl std::fmt::Debug for ScrollHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollHost")
            .field("offset", &self.inner.scroll_offset())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ScrollHost {
    pub fn new(inner: Box<dyn Scrollable>, policy: ScrollPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> ScrollPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ScrollPolicy) {
        self.policy = policy;
    }

    pub fn offset(&self) -> i32 {
        self.inner.scroll_offset()
    }

    /// Scroll initiated by the user; always honored.
    pub fn user_scroll_to(&mut self, offset: i32) {
        self.inner.set_scroll_offset(offset);
    }

    /// Programmatic scroll; refused (returns `false`) when the policy blocks it.
    pub fn scroll_to(&mut self, offset: i32) -> bool {
        if self.policy.block_programmatic {
            BLOCKED_SCROLLS.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.inner.set_scroll_offset(offset);
        true
    }

    /// Perturb the offset by one unit and back so the container repaints.
    /// The visible offset is unchanged afterward and the policy is restored.
    pub fn force_repaint(&mut self) {
        let saved = self.policy;
        self.policy.block_programmatic = false;
        let y = self.inner.scroll_offset();
        self.scroll_to(y + 1);
        self.scroll_to(y);
        self.policy = saved;
        SCROLL_NUDGES.fetch_add(1, Ordering::Relaxed);
        trace!(target: "render.surface", offset = y, "scroll_nudge");
    }
}

pub trait RenderSurface {
    /// Replace the displayed buffer (plain or decorated).
    fn set_text(&mut self, text: &RenderedText<'_>);
    /// Mark buffer ranges for redraw.
    fn invalidate(&mut self, dirty: &[Range<usize>]);
    fn request_layout(&mut self);
    /// Enclosing scroll container, if any.
    fn scroll_host(&mut self) -> Option<&mut ScrollHost> {
        None
    }
}

/// Make `surface` show `text` even if its own heuristics see no change.
pub fn force_refresh(
    surface: &mut dyn RenderSurface,
    text: &RenderedText<'_>,
    dirty: &[Range<usize>],
) {
    surface.set_text(text);
    surface.invalidate(dirty);
    surface.request_layout();
    if let Some(host) = surface.scroll_host() {
        host.force_repaint();
    }
    FORCED_REFRESHES.fetch_add(1, Ordering::Relaxed);
    trace!(target: "render.surface", dirty_ranges = dirty.len(), "force_refresh");
}

/// Surface that records every call; used by tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub text: String,
    pub decorated: bool,
    pub invalidated: Vec<Range<usize>>,
    pub set_text_calls: usize,
    pub layout_requests: usize,
    pub host: Option<ScrollHost>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scroll_host(host: ScrollHost) -> Self {
        Self {
            host: Some(host),
            ..Self::default()
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn set_text(&mut self, text: &RenderedText<'_>) {
        self.text = text.text().to_string();
        self.decorated = text.layer().is_some();
        self.set_text_calls += 1;
    }

    fn invalidate(&mut self, dirty: &[Range<usize>]) {
        self.invalidated.extend(dirty.iter().cloned());
    }

    fn request_layout(&mut self) {
        self.layout_requests += 1;
    }

    fn scroll_host(&mut self) -> Option<&mut ScrollHost> {
        self.host.as_mut()
    }
}

/// Scrollable that logs every offset it is set to.
#[derive(Clone, Debug, Default)]
pub struct RecordingScroll {
    pub offset: i32,
    pub history: std::rc::Rc<std::cell::RefCell<Vec<i32>>>,
}

impl Scrollable for RecordingScroll {
    fn scroll_offset(&self) -> i32 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: i32) {
        self.offset = offset;
        self.history.borrow_mut().push(offset);
    }
}
