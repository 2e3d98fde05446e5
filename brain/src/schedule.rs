//! Cancellable deferred tasks on a host-driven clock.

use std::time::Duration;

#[derive(Debug)]
struct Pending<T> {
    due: Duration,
    task: T,
}

/// A single pending task owned by exactly one state machine.
///
/// Scheduling replaces whatever was pending, so an owner can never have two callbacks
/// in flight, and a cancelled task cannot fire later.
#[derive(Debug)]
pub struct Deferred<T> {
    pending: Option<Pending<T>>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the task that was displaced, if any.
    pub fn schedule(&mut self, due: Duration, task: T) -> Option<T> {
        self.pending.replace(Pending { due, task }).map(|p| p.task)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.task)
    }

    /// Cancels and reports how long the task still had to wait.
    pub fn suspend(&mut self, now: Duration) -> Option<(Duration, T)> {
        self.pending.take().map(|p| (p.due.saturating_sub(now), p.task))
    }

    pub fn take_due(&mut self, now: Duration) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            self.cancel()
        } else {
            None
        }
    }

    pub fn due(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
