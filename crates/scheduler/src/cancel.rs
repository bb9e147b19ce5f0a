//! Cancellation tokens for superseded overlay work
//!
//! Each scheduled commit carries a token. When newer content arrives the
//! previous token is cancelled, so a commit that was already handed to the
//! event loop can tell it no longer applies.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared cancellation flag
///
/// Clones observe the same state. Cancelling is idempotent.
///
/// # Example
///
/// ```
/// use pdf_overlay_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let pending = token.clone();
///
/// token.cancel();
/// assert!(pending.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel()` was called on this token or a clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Issues one live token at a time
///
/// Starting a new generation cancels the token of the previous one. This is
/// the supersede-and-cancel rule used when content is replaced while a
/// commit is still pending.
#[derive(Debug, Default)]
pub struct Supersession {
    generation: u64,
    current: Option<CancellationToken>,
}

impl Supersession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the live token (if any) and issue a fresh one
    pub fn begin(&mut self) -> (u64, CancellationToken) {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }

        self.generation += 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        (self.generation, token)
    }

    /// Cancel the live token without issuing a new one
    ///
    /// Returns `true` if a live token existed.
    pub fn cancel_current(&mut self) -> bool {
        match self.current.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Generation number of the most recent `begin()`
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` is still the live one
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
            && self.current.as_ref().is_some_and(|token| !token.is_cancelled())
    }
}
