// Monitor activity log. Every kept record is also emitted through tracing.
use chrono::{DateTime, Utc};
use shared::models::LogRecord;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY: usize = 100;

#[derive(Debug)]
pub struct ActivityLog {
    last_message: Option<String>,
    records: VecDeque<LogRecord>,
    capacity: usize,
    suppressed: u64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ActivityLog {
            last_message: None,
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            suppressed: 0,
        }
    }

    /// Appends a record unless it repeats the previous message. Returns whether it was kept.
    pub fn record(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.last_message.as_deref() == Some(message.as_str()) {
            self.suppressed += 1;
            return false;
        }

        tracing::info!(target: "energy_monitor", "{}", message);
        self.last_message = Some(message.clone());
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(LogRecord { timestamp, message });
        true
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped as consecutive duplicates.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
