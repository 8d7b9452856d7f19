//! The timed green → yellow → red → green run.
//!
//! Only one run may be active at a time.  A trigger that arrives while a run
//! is active is logged and dropped; it is not queued.

use std::sync::Arc;

use semaforo_core::{CycleTimes, Phase};
use tracing::{debug, warn};

use crate::application::ports::Actuator;
use crate::application::state::SharedState;
use crate::application::supervisor::TaskSupervisor;

/// How a call to [`SequenceController::start`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A full cycle ran and the signal is back at green.
    Completed,
    /// Another run was already active; nothing changed except one log entry.
    AlreadyRunning,
}

/// Drives the signal through one full cycle per accepted trigger.
pub struct SequenceController {
    state: Arc<SharedState>,
    actuator: Arc<dyn Actuator>,
    times: CycleTimes,
    supervisor: TaskSupervisor,
}

/// Clears the run flag when the run ends, including by panic or cancellation.
struct RunGuard<'a> {
    state: &'a SharedState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.finish_run();
    }
}

impl SequenceController {
    pub fn new(
        state: Arc<SharedState>,
        actuator: Arc<dyn Actuator>,
        times: CycleTimes,
        supervisor: TaskSupervisor,
    ) -> Self {
        Self {
            state,
            actuator,
            times,
            supervisor,
        }
    }

    /// Runs one full cycle, returning once the closing green is shown.
    ///
    /// Each phase sets the signal and logs it under one lock hold, then
    /// renders it on the panel, then waits the phase's hold time.  A panel
    /// error is logged and the timing continues.
    pub async fn start(&self) -> RunOutcome {
        if !self.state.try_begin_run() {
            self.state
                .log("Cycle already in progress; ignoring new trigger");
            return RunOutcome::AlreadyRunning;
        }
        let _guard = RunGuard { state: &self.state };

        self.state.log("Cycle started");
        for phase in self.times.phases() {
            self.enter(&phase);
            if !phase.hold.is_zero() {
                tokio::time::sleep(phase.hold).await;
            }
        }
        debug!("cycle finished after {:?}", self.times.total());
        RunOutcome::Completed
    }

    fn enter(&self, phase: &Phase) {
        self.state.transition(phase.state, phase.describe());
        if let Err(e) = self.actuator.render(phase.state) {
            warn!("failed to render {}: {e}", phase.state);
            self.state.log(format!("Panel error: {e}"));
        }
    }

    /// Starts a run in the background and returns immediately.
    pub fn trigger(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        self.supervisor.spawn("sequence run", async move {
            controller.start().await;
            Ok(())
        });
    }
}
