//! Shared fixtures for the controller integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use semaforo_controller::application::dispatch::FrameDispatcher;
use semaforo_controller::application::ports::TimeSource;
use semaforo_controller::application::sequence::SequenceController;
use semaforo_controller::application::state::SharedState;
use semaforo_controller::application::supervisor::TaskSupervisor;
use semaforo_controller::infrastructure::actuator::mock::RecordingActuator;
use semaforo_controller::infrastructure::network::listener::ConnectionContext;
use semaforo_core::CycleTimes;

pub const TIMESTAMP: &str = "[12:34:56] ";

/// Time source that always reports the same time of day.
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn time_of_day(&self) -> String {
        "12:34:56".to_string()
    }
}

/// A fully wired controller with a recording panel.
pub struct Harness {
    pub state: Arc<SharedState>,
    pub panel: Arc<RecordingActuator>,
    pub sequence: Arc<SequenceController>,
    pub supervisor: TaskSupervisor,
}

impl Harness {
    /// Must be called inside a Tokio runtime.
    pub fn new(times: CycleTimes) -> Self {
        let state = Arc::new(SharedState::new(100, Arc::new(FixedTime)));
        let panel = Arc::new(RecordingActuator::new());
        let (supervisor, _reaper) = TaskSupervisor::start();
        let sequence = Arc::new(SequenceController::new(
            Arc::clone(&state),
            panel.clone(),
            times,
            supervisor.clone(),
        ));
        Self {
            state,
            panel,
            sequence,
            supervisor,
        }
    }

    pub fn dispatcher(&self) -> FrameDispatcher {
        FrameDispatcher::new(Arc::clone(&self.state), Arc::clone(&self.sequence))
    }

    pub fn connection_context(&self, read_timeout: Duration) -> ConnectionContext {
        ConnectionContext {
            dispatcher: self.dispatcher(),
            state: Arc::clone(&self.state),
            read_timeout,
        }
    }

    /// Event-log messages without their timestamps.
    pub fn messages(&self) -> Vec<String> {
        self.state
            .snapshot()
            .log
            .into_iter()
            .map(|line| line.trim_start_matches(TIMESTAMP).to_string())
            .collect()
    }

    pub fn count_messages(&self, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}
