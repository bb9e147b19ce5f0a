//! Quiet-period scheduling
//!
//! Expensive layout work (measuring thousands of text runs) should not run
//! while the user is actively scrolling. Work is scheduled "after quiet": it
//! runs right away when the last recorded activity is older than the delay,
//! otherwise it is deferred by one delay and the quiet test is repeated when
//! the deferral elapses.
//!
//! The host event loop drives everything through explicit `now` instants,
//! so no timers or threads are involved.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default quiet period before committing layout work (200ms)
pub const DEFAULT_QUIET_DELAY: Duration = Duration::from_millis(200);

/// Records the instant of the most recent user activity (scroll, drag)
///
/// Stored as nanoseconds since the tracker was created so it can be shared
/// without a lock.
#[derive(Debug)]
pub struct ActivityTracker {
    origin: Instant,
    /// Nanoseconds since `origin` plus one; zero means "never"
    last: AtomicU64,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self { origin: Instant::now(), last: AtomicU64::new(0) }
    }

    /// Record activity happening now
    pub fn record(&self) {
        self.record_at(Instant::now());
    }

    /// Record activity at a specific instant
    ///
    /// Instants earlier than the tracker's creation are clamped to it.
    pub fn record_at(&self, at: Instant) {
        let nanos = at.saturating_duration_since(self.origin).as_nanos();
        let encoded = u64::try_from(nanos).unwrap_or(u64::MAX - 1).saturating_add(1);
        self.last.store(encoded, Ordering::Release);
    }

    /// The most recent recorded activity, if any
    pub fn last_activity(&self) -> Option<Instant> {
        match self.last.load(Ordering::Acquire) {
            0 => None,
            encoded => Some(self.origin + Duration::from_nanos(encoded - 1)),
        }
    }

    /// Forget all recorded activity
    pub fn clear(&self) {
        self.last.store(0, Ordering::Release);
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a quiet-period check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuietDecision {
    /// No recent activity; run immediately
    RunNow,
    /// Activity too recent; check again at `until`
    Defer { until: Instant },
}

/// Decide whether work may run at `now` given the last activity
///
/// Work runs when strictly more than `delay` has passed since the last
/// activity. Otherwise it is deferred by a full `delay` from `now`.
pub fn schedule_after_quiet(
    last_activity: Option<Instant>,
    delay: Duration,
    now: Instant,
) -> QuietDecision {
    match last_activity {
        Some(last) if now.saturating_duration_since(last) <= delay => {
            QuietDecision::Defer { until: now + delay }
        }
        _ => QuietDecision::RunNow,
    }
}

/// Single-slot debounce timer
///
/// Holds at most one pending action. Scheduling a new action replaces the
/// pending one, which is handed back to the caller so it can be cancelled.
#[derive(Debug)]
pub struct QuietTimer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> QuietTimer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` after a quiet period
    ///
    /// Returns `Scheduled::Ready` when the action may run right away, or
    /// `Scheduled::Deferred` carrying any action this one replaced.
    pub fn schedule(
        &mut self,
        action: T,
        last_activity: Option<Instant>,
        now: Instant,
    ) -> Scheduled<T> {
        let replaced = self.pending.take().map(|(previous, _)| previous);

        match schedule_after_quiet(last_activity, self.delay, now) {
            QuietDecision::RunNow => Scheduled::Ready { action, replaced },
            QuietDecision::Defer { until } => {
                tracing::debug!(delay_ms = self.delay.as_millis() as u64, "deferring until quiet");
                self.pending = Some((action, until));
                Scheduled::Deferred { until, replaced }
            }
        }
    }

    /// Release the pending action if its deadline passed and activity is quiet
    ///
    /// When the deadline has passed but activity continued, the action is
    /// deferred again by one delay.
    pub fn poll(&mut self, last_activity: Option<Instant>, now: Instant) -> Option<T> {
        let (_, deadline) = self.pending.as_ref()?;
        if now < *deadline {
            return None;
        }

        match schedule_after_quiet(last_activity, self.delay, now) {
            QuietDecision::RunNow => self.pending.take().map(|(action, _)| action),
            QuietDecision::Defer { until } => {
                if let Some((_, deadline)) = self.pending.as_mut() {
                    *deadline = until;
                }
                None
            }
        }
    }

    /// Drop the pending action without running it
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(action, _)| action)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending action, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

/// Outcome of [`QuietTimer::schedule`]
#[derive(Debug)]
pub enum Scheduled<T> {
    Ready { action: T, replaced: Option<T> },
    Deferred { until: Instant, replaced: Option<T> },
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(200);

    #[test]
    fn test_runs_now_without_activity() {
        let now = Instant::now();
        assert_eq!(schedule_after_quiet(None, DELAY, now), QuietDecision::RunNow);
    }

    #[test]
    fn test_runs_now_after_quiet_period() {
        let last = Instant::now();
        let now = last + Duration::from_millis(201);
        assert_eq!(schedule_after_quiet(Some(last), DELAY, now), QuietDecision::RunNow);
    }

    #[test]
    fn test_defers_at_exact_delay() {
        let last = Instant::now();
        let now = last + DELAY;
        assert_eq!(
            schedule_after_quiet(Some(last), DELAY, now),
            QuietDecision::Defer { until: now + DELAY }
        );
    }

    #[test]
    fn test_activity_tracker_records() {
        let tracker = ActivityTracker::new();
        assert!(tracker.last_activity().is_none());

        let at = Instant::now() + Duration::from_millis(50);
        tracker.record_at(at);
        let recorded = tracker.last_activity().expect("activity should be recorded");
        assert!(recorded.saturating_duration_since(at) < Duration::from_micros(1));
        assert!(at.saturating_duration_since(recorded) < Duration::from_micros(1));

        tracker.clear();
        assert!(tracker.last_activity().is_none());
    }

    #[test]
    fn test_timer_defers_and_releases() {
        let mut timer = QuietTimer::new(DELAY);
        let start = Instant::now();

        let scheduled = timer.schedule("commit", Some(start), start + Duration::from_millis(10));
        let until = match scheduled {
            Scheduled::Deferred { until, replaced } => {
                assert!(replaced.is_none());
                until
            }
            Scheduled::Ready { .. } => panic!("expected deferral"),
        };
        assert!(timer.is_pending());

        assert_eq!(timer.poll(Some(start), until - Duration::from_millis(1)), None);
        assert_eq!(timer.poll(Some(start), until), Some("commit"));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_timer_redefers_while_activity_continues() {
        let mut timer = QuietTimer::new(DELAY);
        let start = Instant::now();

        timer.schedule(1, Some(start), start);
        let first_deadline = timer.deadline().expect("pending");

        // Scrolling continued right before the deadline.
        let still_scrolling = first_deadline - Duration::from_millis(5);
        assert_eq!(timer.poll(Some(still_scrolling), first_deadline), None);
        let second_deadline = timer.deadline().expect("still pending");
        assert_eq!(second_deadline, first_deadline + DELAY);

        assert_eq!(timer.poll(Some(still_scrolling), second_deadline), Some(1));
    }

    #[test]
    fn test_schedule_replaces_pending() {
        let mut timer = QuietTimer::new(DELAY);
        let start = Instant::now();

        timer.schedule("old", Some(start), start);
        match timer.schedule("new", None, start) {
            Scheduled::Ready { action, replaced } => {
                assert_eq!(action, "new");
                assert_eq!(replaced, Some("old"));
            }
            Scheduled::Deferred { .. } => panic!("expected immediate run"),
        }
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_cancel() {
        let mut timer = QuietTimer::new(DELAY);
        let start = Instant::now();
        timer.schedule(7, Some(start), start);
        assert_eq!(timer.cancel(), Some(7));
        assert_eq!(timer.cancel(), None);
    }
}
