//! In-memory sink
//!
//! Keeps the most recent formatted lines in a bounded ring buffer so that
//! embedders can display recent output, and so routing can be inspected.

use std::collections::VecDeque;
use std::io;
use std::sync::RwLock;

use super::Sink;
use crate::level::Level;
use crate::record::Record;

/// A line captured by a [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    /// Level of the record that produced the line
    pub level: Level,
    /// Logger that produced the record
    pub logger: String,
    /// Unformatted message
    pub message: String,
    /// Fully formatted line
    pub line: String,
}

/// Thread-safe ring buffer of formatted records
#[derive(Debug)]
pub struct MemorySink {
    entries: RwLock<VecDeque<CapturedLine>>,
    max_entries: usize,
}

impl MemorySink {
    /// Create a sink that keeps at most `max_entries` lines
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries,
        }
    }

    /// Get all captured lines, oldest first
    pub fn entries(&self) -> Vec<CapturedLine> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the unformatted messages, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|e| e.iter().map(|entry| entry.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Get the formatted lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|e| e.iter().map(|entry| entry.line.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Sink for MemorySink {
    fn write_line(&self, record: &Record, line: &str) -> io::Result<()> {
        if self.max_entries == 0 {
            return Ok(());
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(CapturedLine {
                level: record.level,
                logger: record.logger.clone(),
                message: record.message.clone(),
                line: line.to_string(),
            });
        }
        Ok(())
    }
}
