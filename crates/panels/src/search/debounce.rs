//! Keystroke debouncing.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Holds back the latest value until no newer one arrived for `delay`.
///
/// Runs on the tokio clock, so tests can drive it with a paused runtime.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    /// Creates a debouncer. A zero delay passes values straight through.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// The debounce delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Records a value and re-arms the deadline.
    ///
    /// Returns the value right away when the delay is zero.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.delay.is_zero() {
            self.pending = None;
            return Some(value);
        }
        self.pending = Some(Pending {
            value,
            deadline: Instant::now() + self.delay,
        });
        None
    }

    /// Takes the pending value if its deadline has passed.
    pub fn poll(&mut self) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|p| p.deadline <= Instant::now());
        if ready {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Takes the pending value regardless of its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Drops the pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Deadline of the pending value.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Whether a value is waiting, expired or not.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the pending deadline, then takes the value.
    pub async fn settle(&mut self) -> Option<T> {
        if let Some(deadline) = self.deadline() {
            tokio::time::sleep_until(deadline).await;
        }
        self.poll()
    }
}
