//! Persistent storage for the controller.
//!
//! - **`config`** – Loads, validates and defaults the TOML configuration file.

pub mod config;
