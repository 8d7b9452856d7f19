//! The shared state store.
//!
//! Every task in the controller (accept loop, one handler per connection,
//! the active sequence run, clock sync) reads and writes the same
//! [`SharedState`].  It owns:
//!
//! - the current [`SignalState`],
//! - the bounded event log,
//! - the registry of live connections,
//! - the trigger debounce gate,
//! - the "a run is in progress" flag.
//!
//! # Locking
//!
//! All fields sit behind one `std::sync::Mutex`.  Every method takes the lock,
//! does its work and releases it before returning; no lock is ever held across
//! an `.await`.  Operations that must be observed together, such as a state
//! change and the log entry describing it, happen under a single lock hold so
//! no reader can see one without the other.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use semaforo_core::{
    ConnectionId, ConnectionRecord, LogBuffer, LogEntry, SignalState, StatusSnapshot, TriggerGate,
};
use tracing::info;

use crate::application::ports::TimeSource;

struct Inner {
    signal: SignalState,
    log: LogBuffer,
    connections: HashMap<ConnectionId, ConnectionRecord>,
    gate: TriggerGate,
    run_in_progress: bool,
}

/// State shared by every task.  Wrap in an `Arc` and hand a clone to each task.
pub struct SharedState {
    inner: Mutex<Inner>,
    clock: Arc<dyn TimeSource>,
}

impl SharedState {
    /// Creates the store with the signal at green and an empty log holding at
    /// most `max_log_lines` entries.
    pub fn new(max_log_lines: usize, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                signal: SignalState::default(),
                log: LogBuffer::new(max_log_lines),
                connections: HashMap::new(),
                gate: TriggerGate::new(),
                run_in_progress: false,
            }),
            clock,
        }
    }

    // A panic while holding the lock cannot leave `Inner` half-updated (every
    // mutation is a single assignment or push), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, message: String) -> LogEntry {
        LogEntry::new(self.clock.time_of_day(), message)
    }

    // ── Event log ─────────────────────────────────────────────────────────────

    /// Appends an event to the log, evicting the oldest entry when full.
    pub fn log(&self, message: impl Into<String>) {
        let entry = self.entry(message.into());
        info!(target: "semaforo::event", "{entry}");
        self.lock().log.push(entry);
    }

    /// Number of entries currently held.
    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    // ── Signal ────────────────────────────────────────────────────────────────

    pub fn signal(&self) -> SignalState {
        self.lock().signal
    }

    /// Sets the signal and appends `message` under one lock hold.
    pub fn transition(&self, state: SignalState, message: impl Into<String>) {
        let entry = self.entry(message.into());
        info!(target: "semaforo::event", "{entry}");
        let mut inner = self.lock();
        inner.signal = state;
        inner.log.push(entry);
    }

    // ── Sequence run flag ─────────────────────────────────────────────────────

    /// Marks a run as started.  Returns `false` if one is already in progress.
    pub fn try_begin_run(&self) -> bool {
        let mut inner = self.lock();
        if inner.run_in_progress {
            return false;
        }
        inner.run_in_progress = true;
        true
    }

    /// Clears the run flag.
    pub fn finish_run(&self) {
        self.lock().run_in_progress = false;
    }

    pub fn is_run_in_progress(&self) -> bool {
        self.lock().run_in_progress
    }

    // ── Trigger gate ──────────────────────────────────────────────────────────

    /// Evaluates the debounce gate for a trigger arriving at `now`.
    ///
    /// Check and update happen under one lock hold, so two handlers racing on
    /// the same window can never both be accepted.
    pub fn try_accept_trigger(&self, now: Instant) -> bool {
        self.lock().gate.try_accept(now)
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.lock().gate.last_accepted()
    }

    // ── Connection registry ───────────────────────────────────────────────────

    /// Records a newly accepted connection and returns its id.
    pub fn register_connection(&self, peer_address: SocketAddr) -> ConnectionId {
        let record = ConnectionRecord::new(peer_address);
        let id = record.id;
        self.lock().connections.insert(id, record);
        id
    }

    /// Removes a connection.  Returns `false` if it was not registered.
    pub fn remove_connection(&self, id: ConnectionId) -> bool {
        self.lock().connections.remove(&id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Snapshot of all live connections.
    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.lock().connections.values().cloned().collect()
    }

    // ── Status ────────────────────────────────────────────────────────────────

    /// Captures the signal and the log together.
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock();
        StatusSnapshot::capture(inner.signal, &inner.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FixedTime;

    impl TimeSource for FixedTime {
        fn time_of_day(&self) -> String {
            "10:20:30".to_string()
        }
    }

    fn make_state(max_lines: usize) -> SharedState {
        SharedState::new(max_lines, Arc::new(FixedTime))
    }

    #[test]
    fn test_initial_state_is_green_and_idle() {
        let state = make_state(10);
        assert_eq!(state.signal(), SignalState::Green);
        assert!(!state.is_run_in_progress());
        assert_eq!(state.log_len(), 0);
        assert_eq!(state.connection_count(), 0);
        assert!(state.last_trigger().is_none());
    }

    #[test]
    fn test_log_is_timestamped() {
        let state = make_state(10);
        state.log("hello");
        assert_eq!(state.snapshot().log, vec!["[10:20:30] hello".to_string()]);
    }

    #[test]
    fn test_log_respects_capacity() {
        let state = make_state(3);
        for n in 0..10 {
            state.log(format!("event {n}"));
        }
        let log = state.snapshot().log;
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], "[10:20:30] event 7");
        assert_eq!(log[2], "[10:20:30] event 9");
    }

    #[test]
    fn test_transition_sets_state_and_logs_together() {
        // Arrange
        let state = make_state(10);

        // Act
        state.transition(SignalState::Red, "State: red");

        // Assert
        let snapshot = state.snapshot();
        assert_eq!(snapshot.state, SignalState::Red);
        assert_eq!(
            snapshot.log.last().map(String::as_str),
            Some("[10:20:30] State: red")
        );
    }

    #[test]
    fn test_run_flag_allows_only_one_run() {
        let state = make_state(10);
        assert!(state.try_begin_run());
        assert!(!state.try_begin_run());
        assert!(state.is_run_in_progress());
        state.finish_run();
        assert!(state.try_begin_run());
    }

    #[test]
    fn test_trigger_gate_is_shared() {
        let state = make_state(10);
        let t0 = Instant::now();
        assert!(state.try_accept_trigger(t0));
        assert!(!state.try_accept_trigger(t0 + Duration::from_secs(3)));
        assert_eq!(state.last_trigger(), Some(t0));
        assert!(state.try_accept_trigger(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_connection_registry_add_and_remove() {
        let state = make_state(10);
        let peer: SocketAddr = "10.0.0.7:40000".parse().unwrap();
        let a = state.register_connection(peer);
        let b = state.register_connection(peer);
        assert_eq!(state.connection_count(), 2);

        assert!(state.remove_connection(a));
        assert!(!state.remove_connection(a));
        assert_eq!(state.connection_count(), 1);
        assert_eq!(state.connections()[0].id, b);
    }

    #[test]
    fn test_concurrent_trigger_attempts_accept_exactly_one() {
        let state = Arc::new(make_state(10));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.try_accept_trigger(now))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
    }
}
