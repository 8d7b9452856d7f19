//! Bounded, insertion-ordered event log.
//!
//! The controller keeps the last `capacity` events in memory for the status
//! page.  When a new entry would exceed the capacity the oldest entry is
//! evicted first (FIFO); the relative order of the survivors never changes.
//! Nothing is persisted across restarts.

use std::collections::VecDeque;
use std::fmt;

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Wall-clock time of day, `HH:MM:SS`.
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp, self.message)
    }
}

/// FIFO ring of [`LogEntry`] values with a fixed maximum length.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    /// Creates an empty buffer holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one so the newest event is always visible.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `entry`, evicting the oldest entry when full.
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, entry: LogEntry) -> Option<LogEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Renders every entry as `[HH:MM:SS] message`, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}
