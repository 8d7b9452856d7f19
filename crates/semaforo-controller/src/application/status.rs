//! Read-only view of the controller for the status endpoint.

use std::sync::Arc;

use semaforo_core::StatusSnapshot;

use crate::application::state::SharedState;

/// Hands out consistent snapshots of the signal and the event log.
#[derive(Clone)]
pub struct StatusExporter {
    state: Arc<SharedState>,
}

impl StatusExporter {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }

    /// Captures the current signal and log.  Never mutates state.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TimeSource;
    use semaforo_core::SignalState;

    struct FixedTime;

    impl TimeSource for FixedTime {
        fn time_of_day(&self) -> String {
            "08:15:00".to_string()
        }
    }

    #[test]
    fn test_snapshot_reflects_latest_transition() {
        // Arrange
        let state = Arc::new(SharedState::new(10, Arc::new(FixedTime)));
        let exporter = StatusExporter::new(Arc::clone(&state));

        // Act
        state.transition(SignalState::Yellow, "State: yellow");
        let snapshot = exporter.snapshot();

        // Assert
        assert_eq!(snapshot.state, SignalState::Yellow);
        assert_eq!(snapshot.log, vec!["[08:15:00] State: yellow".to_string()]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let state = Arc::new(SharedState::new(10, Arc::new(FixedTime)));
        state.log("one");
        let exporter = StatusExporter::new(Arc::clone(&state));

        let first = exporter.snapshot();
        let second = exporter.snapshot();

        assert_eq!(first, second);
        assert_eq!(state.log_len(), 1);
    }
}
