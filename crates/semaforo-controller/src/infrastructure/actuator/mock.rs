//! Recording actuator for tests.
//!
//! Every `render` call is pushed into a `Mutex<Vec<...>>` together with the
//! Tokio instant it happened at, so tests running on paused time can assert
//! both the order of states and the exact delay between them.
//!
//! ```ignore
//! let panel = Arc::new(RecordingActuator::new());
//! // ... run a cycle ...
//! assert_eq!(panel.states(), vec![Green, Yellow, Red, Green]);
//! ```
//!
//! Set `should_fail` to make every call return an error.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use semaforo_core::SignalState;
use tokio::time::Instant;

use crate::application::ports::{Actuator, ActuatorError};

#[derive(Default)]
pub struct RecordingActuator {
    /// Each state passed to `render`, with the time of the call.
    pub renders: Mutex<Vec<(SignalState, Instant)>>,
    /// Number of `blank` calls.
    pub blanks: AtomicUsize,
    /// When `true`, every call returns `ActuatorError::Write`.
    pub should_fail: AtomicBool,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// States rendered so far, in call order.
    pub fn states(&self) -> Vec<SignalState> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(state, _)| *state)
            .collect()
    }

    /// Render calls with their timestamps.
    pub fn timeline(&self) -> Vec<(SignalState, Instant)> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn blank_count(&self) -> usize {
        self.blanks.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ActuatorError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(ActuatorError::Write("mock failure".to_string()));
        }
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn render(&self, state: SignalState) -> Result<(), ActuatorError> {
        self.check()?;
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((state, Instant::now()));
        Ok(())
    }

    fn blank(&self) -> Result<(), ActuatorError> {
        self.check()?;
        self.blanks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
