//! One-shot cancelable timers keyed by entity.
//!
//! There are no threads: the owner polls with the current `Instant` from its
//! own loop, and due payloads come back in deadline order. At most one timer
//! is pending per key; scheduling again replaces (cancels) the previous one.

use std::time::Instant;

#[derive(Debug)]
struct Pending<K, T> {
    key: K,
    due: Instant,
    seq: u64,
    payload: T,
}

#[derive(Debug)]
pub struct TapTimers<K, T> {
    pending: Vec<Pending<K, T>>,
    seq: u64,
}

impl<K, T> Default for TapTimers<K, T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            seq: 0,
        }
    }
}

impl<K: PartialEq, T> TapTimers<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for `key`. Returns the payload of the timer it replaced.
    pub fn schedule(&mut self, key: K, due: Instant, payload: T) -> Option<T> {
        let replaced = self.cancel(&key);
        self.seq += 1;
        self.pending.push(Pending {
            key,
            due,
            seq: self.seq,
            payload,
        });
        replaced
    }

    /// Disarm the timer for `key`, returning its payload.
    pub fn cancel(&mut self, key: &K) -> Option<T> {
        let index = self.pending.iter().position(|p| &p.key == key)?;
        Some(self.pending.swap_remove(index).payload)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.iter().any(|p| &p.key == key)
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn poll(&mut self, now: Instant) -> Vec<(K, T)> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter().map(|p| (p.key, p.payload)).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn schedule_replaces_previous_timer_for_key() {
        let t0 = Instant::now();
        let mut timers = TapTimers::new();
        assert_eq!(timers.schedule("a", t0 + Duration::from_millis(10), 1), None);
        assert_eq!(timers.schedule("a", t0 + Duration::from_millis(20), 2), Some(1));
        assert_eq!(timers.len(), 1);
        assert!(timers.poll(t0 + Duration::from_millis(15)).is_empty());
        assert_eq!(timers.poll(t0 + Duration::from_millis(20)), vec![("a", 2)]);
        assert!(timers.is_empty());
    }

    #[test]
    fn poll_returns_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = TapTimers::new();
        timers.schedule("late", t0 + Duration::from_millis(30), ());
        timers.schedule("early", t0 + Duration::from_millis(10), ());
        timers.schedule("later", t0 + Duration::from_millis(90), ());
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(10)));
        let fired: Vec<_> = timers
            .poll(t0 + Duration::from_millis(50))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(fired, vec!["early", "late"]);
        assert!(timers.is_pending(&"later"));
    }

    #[test]
    fn cancel_disarms() {
        let t0 = Instant::now();
        let mut timers = TapTimers::new();
        timers.schedule(1u8, t0, "x");
        assert_eq!(timers.cancel(&1), Some("x"));
        assert_eq!(timers.cancel(&1), None);
        assert!(timers.poll(t0 + Duration::from_secs(1)).is_empty());
    }
}
