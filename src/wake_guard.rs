//! Timed wake hold keeping the system out of suspend after an interrupt.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;

/// Default hold window armed by the interrupt handler.
pub const DEFAULT_HOLD: Duration = Duration::from_millis(1000);

/// Advisory timed lock with states idle and held-until-deadline.
///
/// Re-arming while held extends or resets the deadline; expiry is observed
/// lazily on the next state query, so no timer task is required. The guard
/// affects suspend policy only; it is not a hard resource and holding it past
/// its usefulness leaks nothing.
///
/// `arm` is non-blocking and never takes any other lock, which makes it safe
/// to call from the interrupt path.
#[derive(Debug, Default)]
pub struct WakeGuard {
    deadline: Mutex<Option<Instant>>,
}

impl WakeGuard {
    /// Creates an idle guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the guard until `hold` from now, replacing any earlier deadline.
    pub fn arm(&self, hold: Duration) {
        let deadline = Instant::now() + hold;
        *self.deadline.lock().unwrap() = Some(deadline);
        debug!("wake guard armed for {} ms", hold.as_millis());
    }

    /// Returns whether the hold window is still open.
    pub fn is_held(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left in the hold window, or `None` when idle or expired.
    pub fn remaining(&self) -> Option<Duration> {
        let deadline = (*self.deadline.lock().unwrap())?;
        deadline.checked_duration_since(Instant::now())
    }
}
