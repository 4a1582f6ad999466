//! Debounced save scheduling.
//!
//! A single pending deadline. Every mutation calls [`SaveScheduler::schedule`],
//! which cancels the pending deadline and sets a new one a quiet interval
//! later, so a burst of drag updates collapses into one write.

use std::time::Duration;
use web_time::Instant;

use crate::constants::SAVE_DEBOUNCE;

/// Cancel-and-reschedule save timer.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    /// Quiet interval after the last change before a save is due.
    debounce: Duration,

    /// When the pending save becomes due.
    deadline: Option<Instant>,
}

impl SaveScheduler {
    /// Create a scheduler with the default quiet interval.
    pub fn new() -> Self {
        Self::with_debounce(SAVE_DEBOUNCE)
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Cancel any pending save and schedule a new one.
    pub fn schedule(&mut self) {
        self.schedule_at(Instant::now());
    }

    /// [`schedule`](Self::schedule) with an explicit clock reading.
    pub fn schedule_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
        log::trace!("Save: rescheduled");
    }

    /// Check if a save is scheduled.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the pending save's quiet interval has elapsed at `now`.
    pub fn is_due_at(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Claim the pending save if it is due. The caller must write.
    pub fn take_due_at(&mut self, now: Instant) -> bool {
        if self.is_due_at(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    /// Claim the pending save regardless of the deadline.
    pub fn take_pending(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Drop the pending save without writing.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            log::trace!("Save: cancelled");
        }
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}
