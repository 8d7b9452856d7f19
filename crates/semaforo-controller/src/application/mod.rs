//! Application layer of the controller.
//!
//! Use cases in this layer orchestrate the domain types from `semaforo_core`
//! and talk to the outside world only through the traits in [`ports`].  They
//! contain no socket, file or hardware access.
//!
//! # Sub-modules
//!
//! - **`state`**      – The single shared state object (signal, event log,
//!   connection registry, trigger gate, run flag) every task reads and writes.
//! - **`sequence`**   – The green → yellow → red → green run, one at a time.
//! - **`dispatch`**   – What to do with one read's worth of bytes from a client.
//! - **`status`**     – Read-only snapshots for the status endpoint.
//! - **`supervisor`** – Spawns background tasks and reports how they ended.
//! - **`ports`**      – Traits implemented by the infrastructure layer.

pub mod dispatch;
pub mod ports;
pub mod sequence;
pub mod state;
pub mod status;
pub mod supervisor;
