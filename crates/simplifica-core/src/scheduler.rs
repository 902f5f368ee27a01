//! Cancellable timers on a virtual clock.
//!
//! The orchestrator never sleeps. It schedules tasks against a clock that
//! only moves when the caller says so ([`Scheduler::advance_to`]), which
//! keeps debouncing deterministic and testable. A host binds the clock to
//! real time by advancing it from its own event loop.

use std::time::Duration;

/// Handle returned by [`Scheduler::schedule`]; pass it to
/// [`Scheduler::cancel`] to drop the task before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Entry<T> {
    handle: TimerHandle,
    due: Duration,
    task: T,
}

/// A queue of tasks due at points on a virtual clock.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    pending: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    /// An empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` once `delay` has elapsed from now.
    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Entry {
            handle,
            due: self.now + delay,
            task,
        });
        handle
    }

    /// Cancel a pending task. Returns `false` if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.handle != handle);
        self.pending.len() != before
    }

    /// Whether `handle` is still waiting to fire.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|e| e.handle == handle)
    }

    /// When the earliest pending task is due.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|e| e.due).min()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move the clock forward to `now` and return the tasks that became due,
    /// ordered by due time and then by scheduling order. The clock never
    /// moves backwards.
    pub fn advance_to(&mut self, now: Duration) -> Vec<(TimerHandle, T)> {
        self.now = self.now.max(now);
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|e| e.due <= self.now);
        self.pending = pending;
        due.sort_by_key(|e| (e.due, e.handle.0));
        due.into_iter().map(|e| (e.handle, e.task)).collect()
    }

    /// Advance by `delta` from the current time.
    pub fn advance_by(&mut self, delta: Duration) -> Vec<(TimerHandle, T)> {
        self.advance_to(self.now + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule(30 * MS, "c");
        s.schedule(10 * MS, "a");
        s.schedule(10 * MS, "b");
        assert!(s.advance_to(5 * MS).is_empty());
        let fired: Vec<_> = s.advance_to(30 * MS).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert!(s.is_empty());
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut s = Scheduler::new();
        let h = s.schedule(10 * MS, 1);
        assert!(s.is_pending(h));
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(s.advance_by(100 * MS).is_empty());
    }

    #[test]
    fn delays_are_relative_to_current_time() {
        let mut s = Scheduler::new();
        s.advance_to(1000 * MS);
        s.schedule(200 * MS, ());
        assert_eq!(s.next_due(), Some(1200 * MS));
        assert!(s.advance_to(1199 * MS).is_empty());
        assert_eq!(s.advance_to(1200 * MS).len(), 1);
    }

    #[test]
    fn clock_does_not_run_backwards() {
        let mut s: Scheduler<()> = Scheduler::new();
        s.advance_to(50 * MS);
        s.advance_to(10 * MS);
        assert_eq!(s.now(), 50 * MS);
    }
}
