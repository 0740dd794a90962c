//! Coalesce bursts of events into a single deferred action.

use std::time::{Duration, Instant};

/// Default delay between the last toggle and the preview rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Fixed-delay debouncer driven by caller-supplied timestamps.
///
/// Every `trigger` pushes the deadline back; `take_due` fires once the
/// deadline has passed and then disarms until the next trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Returns `true` exactly once per burst, when the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the deadline, if armed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
