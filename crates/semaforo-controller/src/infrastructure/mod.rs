//! Infrastructure layer for the controller.
//!
//! Contains the OS-facing adapters: the broker TCP listener, the `/status`
//! HTTP endpoint, the LED panel, the wall clock with SNTP sync and the
//! TOML configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `semaforo_core`, but MUST NOT be imported by the `application` layer.

pub mod actuator;
pub mod clock;
pub mod network;
pub mod status_http;
pub mod storage;
