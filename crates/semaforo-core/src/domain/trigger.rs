//! Debounce gate for trigger commands.
//!
//! Panels and phone apps tend to publish the same command several times in a
//! burst.  The gate accepts the first trigger and rejects every further one
//! until [`DEBOUNCE_WINDOW`] has elapsed since the last *accepted* trigger.
//! Rejected triggers do not move the window.

use std::time::{Duration, Instant};

/// Cooldown between two accepted triggers.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(10);

/// Remembers when the last trigger was accepted.
///
/// The gate itself is not synchronised; callers that share it between tasks
/// must evaluate [`TriggerGate::try_accept`] under the same lock that guards
/// the rest of the shared state.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl TriggerGate {
    /// Creates a gate with the default 10-second window.
    pub fn new() -> Self {
        Self::with_window(DEBOUNCE_WINDOW)
    }

    /// Creates a gate with a custom window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Accepts the trigger at `now` unless it falls inside the window.
    ///
    /// On acceptance the last-accepted time moves to `now`.  A `now` that lies
    /// before the last accepted trigger is treated as a duplicate, so the
    /// stored time never goes backwards.
    pub fn try_accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            match now.checked_duration_since(last) {
                Some(elapsed) if elapsed >= self.window => {}
                _ => return false,
            }
        }
        self.last_accepted = Some(now);
        true
    }

    /// Time of the last accepted trigger.
    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for TriggerGate {
    fn default() -> Self {
        Self::new()
    }
}
