// src/scheduler.rs

/// A single deferred task, identified only by when it is due.
///
/// Arming replaces whatever was pending, and cancelling is idempotent. The
/// owner polls it against the host clock, so a superseded task has nothing
/// left to fire.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PendingTask {
    due: Option<f64>,
}

impl PendingTask {
    pub fn new() -> Self {
        Self { due: None }
    }

    #[inline]
    pub fn arm(&mut self, at: f64) {
        self.due = Some(at);
    }

    #[inline]
    pub fn cancel(&mut self) {
        self.due = None;
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    #[inline]
    pub fn due(&self) -> Option<f64> {
        self.due
    }

    /// Consume the task if it is due at `now`.
    pub fn take_due(&mut self, now: f64) -> Option<f64> {
        match self.due {
            Some(at) if at <= now => self.due.take(),
            _ => None,
        }
    }
}
