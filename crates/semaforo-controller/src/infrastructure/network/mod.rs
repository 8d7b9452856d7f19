//! Network infrastructure for the controller.
//!
//! # Sub-modules
//!
//! - **`listener`** – Accepts broker clients on TCP, reads their frames and
//!   hands each read to the application's `FrameDispatcher`.  One supervised
//!   task per connection; a failing connection never affects the others.

pub mod listener;
