//! Log records

use chrono::{DateTime, Local};

use crate::level::Level;

/// A single event on its way through loggers and handlers
#[derive(Debug, Clone)]
pub struct Record {
    /// Timestamp when the record was created
    pub timestamp: DateTime<Local>,
    /// Severity
    pub level: Level,
    /// Dotted name of the logger that produced the record
    pub logger: String,
    /// Rendered message
    pub message: String,
    /// Source file path, if known
    pub file: Option<String>,
    /// Source line, if known
    pub line: Option<u32>,
    /// Function or module path that emitted the record, if known
    pub function: Option<String>,
    /// Name of the emitting thread, if it has one
    pub thread: Option<String>,
}

impl Record {
    /// Create a new record stamped with the current time and thread
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            file: None,
            line: None,
            function: None,
            thread: std::thread::current().name().map(str::to_string),
        }
    }

    /// Attach a source location
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Attach the emitting function or module path
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Final path component of the source file
    pub fn file_name(&self) -> Option<&str> {
        self.file
            .as_deref()
            .map(|path| path.rsplit(['/', '\\']).next().unwrap_or(path))
    }

    /// Source file name without its extension
    pub fn module(&self) -> Option<&str> {
        self.file_name()
            .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
    }
}
