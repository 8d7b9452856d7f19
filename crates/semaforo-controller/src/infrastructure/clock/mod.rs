//! Wall clock used to timestamp event-log entries.
//!
//! The controller may run on a board with no battery-backed clock, so the
//! local time is corrected by an offset learned from an SNTP server (see
//! [`sntp`]).  Until the first successful sync the offset is zero.

pub mod sntp;

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Duration as ChronoDuration, Local};

use crate::application::ports::TimeSource;

/// Local time plus a correction in milliseconds.
#[derive(Debug, Default)]
pub struct WallClock {
    offset_ms: AtomicI64,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current correction applied to the local clock.
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    pub fn set_offset_ms(&self, offset_ms: i64) {
        self.offset_ms.store(offset_ms, Ordering::Relaxed);
    }
}

impl TimeSource for WallClock {
    fn time_of_day(&self) -> String {
        let now = Local::now() + ChronoDuration::milliseconds(self.offset_ms());
        now.format("%H:%M:%S").to_string()
    }
}
