//! Read-only view served to the status page.

use serde::{Deserialize, Serialize};

use super::event_log::LogBuffer;
use super::signal::SignalState;

/// Immutable snapshot of the controller, as returned by `GET /status`.
///
/// ```json
/// {"semaforo": "green", "log": ["[08:15:42] State: green"]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(rename = "semaforo")]
    pub state: SignalState,
    pub log: Vec<String>,
}

impl StatusSnapshot {
    /// Captures `state` and the rendered contents of `log`.
    pub fn capture(state: SignalState, log: &LogBuffer) -> Self {
        Self {
            state,
            log: log.lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_log::LogEntry;

    #[test]
    fn test_snapshot_json_shape() {
        // Arrange
        let mut log = LogBuffer::new(10);
        log.push(LogEntry::new("08:15:42", "State: red"));

        // Act
        let snapshot = StatusSnapshot::capture(SignalState::Red, &log);
        let json = serde_json::to_value(&snapshot).unwrap();

        // Assert
        assert_eq!(
            json,
            serde_json::json!({
                "semaforo": "red",
                "log": ["[08:15:42] State: red"]
            })
        );
    }

    #[test]
    fn test_snapshot_is_detached_from_later_log_writes() {
        let mut log = LogBuffer::new(10);
        log.push(LogEntry::new("08:00:00", "first"));
        let snapshot = StatusSnapshot::capture(SignalState::Green, &log);
        log.push(LogEntry::new("08:00:01", "second"));
        assert_eq!(snapshot.log.len(), 1);
    }
}
