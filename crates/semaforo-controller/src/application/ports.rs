//! Traits the application layer depends on; implemented in `infrastructure`.

use semaforo_core::SignalState;
use thiserror::Error;

/// Error type for panel output.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("panel write failed: {0}")]
    Write(String),
}

/// The physical output that shows the current signal.
///
/// `render` is called once per phase of a run; implementations must return
/// quickly because the sequence timing is measured around the call.
#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send + Sync {
    /// Shows `state` on the panel.
    fn render(&self, state: SignalState) -> Result<(), ActuatorError>;

    /// Turns every pixel off.
    fn blank(&self) -> Result<(), ActuatorError>;
}

/// Source of the wall-clock time of day stamped on event-log entries.
pub trait TimeSource: Send + Sync {
    /// Current local time formatted as `HH:MM:SS`.
    fn time_of_day(&self) -> String;
}
