//! Domain entities for the semaforo controller.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code has no imports from OS APIs,
//! network libraries, or async runtimes, and can be tested in isolation.
//!
//! Here that means: which colour follows which and for how long, how many log
//! lines are kept, when a repeated trigger counts as a duplicate, and what the
//! status page gets to see.  Sockets, timers and the LED strip live in the
//! controller crate and depend on these types, never the other way round.

pub mod connection;
pub mod event_log;
pub mod signal;
pub mod status;
pub mod trigger;
