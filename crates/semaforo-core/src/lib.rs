//! # semaforo-core
//!
//! Shared library for the semaforo traffic-light controller containing the
//! minimal broker frame parser and the signal domain types.
//!
//! It has zero dependencies on OS APIs, sockets, or an async runtime, so all
//! of it can be unit-tested on any machine.
//!
//! # Architecture overview (for beginners)
//!
//! The controller drives a physical traffic-light panel.  A client on the
//! network publishes a short message to a known topic; the controller walks
//! the light through green → yellow → red → green and exposes the current
//! state and recent events to a status page.
//!
//! This crate (`semaforo-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How trigger commands arrive on the wire.  Clients speak
//!   a tiny subset of a publish/subscribe protocol (connect, publish, ping);
//!   [`parse_frame`] turns one read's worth of bytes into a typed [`Frame`].
//!
//! - **`domain`** – Pure business rules with no I/O: the [`SignalState`]
//!   cycle and its timings, the bounded [`LogBuffer`], the [`TriggerGate`]
//!   debounce, connection records and the [`StatusSnapshot`] served to the
//!   status page.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `semaforo_core::SignalState` instead of `semaforo_core::domain::signal::SignalState`.
pub use domain::connection::{ConnectionId, ConnectionRecord};
pub use domain::event_log::{LogBuffer, LogEntry};
pub use domain::signal::{CycleTimes, Phase, SignalState};
pub use domain::status::StatusSnapshot;
pub use domain::trigger::{TriggerGate, DEBOUNCE_WINDOW};
pub use protocol::frame::{parse_frame, Frame, ProtocolError};
