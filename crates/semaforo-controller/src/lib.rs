//! semaforo-controller library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry points share the same module tree.
//!
//! ```text
//! BrokerListener ─► FrameDispatcher ─► SharedState (trigger gate)
//!                                 │
//!                                 └─► SequenceController ─► Actuator
//!                                             │
//!                                             ▼
//!                                        SharedState ◄── StatusExporter ◄── GET /status
//! ```

pub mod application;
pub mod infrastructure;
