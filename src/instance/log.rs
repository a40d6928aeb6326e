//! Append-only activity log.
//!
//! Every instance keeps its own log of what happened during its lifetime;
//! entries are timestamped, carry a severity icon, and are mirrored to the
//! render target by the instance. Nothing is ever removed.

use chrono::{DateTime, Utc};

use crate::task::protocol::LogLevel;

/// One log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Rendered line: `[HH:MM:SS] ✓ message`
    pub fn render(&self) -> String {
        format!(
            "[{}] {} {}",
            self.at.format("%H:%M:%S"),
            self.level.icon(),
            self.message
        )
    }
}

/// Append-only log owned by one tool instance.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry and return its rendered line.
    pub fn append(&mut self, level: LogLevel, message: impl Into<String>) -> String {
        let entry = LogEntry {
            at: Utc::now(),
            level,
            message: message.into(),
        };
        tracing::debug!(level = ?entry.level, "{}", entry.message);
        let line = entry.render();
        self.entries.push(entry);
        line
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}
