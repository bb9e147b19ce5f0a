//! PDF Overlay Scheduler Library
//!
//! Cooperative scheduling primitives for page overlays.
//!
//! Overlay builders run on the UI thread. The only work they postpone is the
//! text layout commit, which waits for scrolling to go quiet. This crate
//! provides the quiet-period timer, the activity tracker that feeds it, and
//! the cancellation tokens used when newer content supersedes a pending
//! commit.
//!
//! # Example
//!
//! ```
//! use pdf_overlay_scheduler::{ActivityTracker, QuietTimer, Scheduled};
//! use std::time::{Duration, Instant};
//!
//! let activity = ActivityTracker::new();
//! let mut timer = QuietTimer::new(Duration::from_millis(200));
//!
//! let now = Instant::now();
//! activity.record_at(now);
//!
//! // The user just scrolled, so the commit is deferred.
//! match timer.schedule("commit", activity.last_activity(), now) {
//!     Scheduled::Deferred { until, .. } => {
//!         let later = until + Duration::from_millis(1);
//!         assert_eq!(timer.poll(activity.last_activity(), later), Some("commit"));
//!     }
//!     Scheduled::Ready { .. } => unreachable!(),
//! }
//! ```

mod cancel;
mod quiet;

pub use cancel::{CancellationToken, Supersession};
pub use quiet::{
    schedule_after_quiet, ActivityTracker, QuietDecision, QuietTimer, Scheduled,
    DEFAULT_QUIET_DELAY,
};
