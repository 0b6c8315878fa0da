//! Bounded exponential backoff for polling loops

use tokio::time::Duration;

/// Exponential backoff: doubles from `base` up to `max`, reset on
/// productive work. Polling never blocks indefinitely — the delay is
/// always bounded by `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base: base.max(Duration::from_millis(1)),
            max,
            current: None,
        }
    }

    /// Next delay to wait
    pub fn next(&mut self) -> Duration {
        let next = match self.current {
            None => self.base,
            Some(current) => (current * 2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    /// Back to the base delay after productive work
    pub fn reset(&mut self) {
        self.current = None;
    }
}
