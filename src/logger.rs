//! Named loggers
//!
//! Logger names are dotted paths (`services.db.pool`). Each dotted prefix is
//! an ancestor, and the empty name is the root. `tracing` targets use `::`
//! instead of `.`; both spellings name the same logger.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::error::Result;
use crate::handler::Handler;
use crate::level::{IntoLevel, Level};
use crate::names::HandlerName;
use crate::record::Record;
use crate::registry::LogRegistry;

/// Name of the root logger
pub const ROOT: &str = "";

/// Canonical dotted form of a logger name or `tracing` target
pub fn normalize_name(name: &str) -> String {
    name.trim().replace("::", ".")
}

/// Parent of a dotted logger name; the root has none
pub(crate) fn parent(name: &str) -> Option<&str> {
    if name.is_empty() {
        return None;
    }
    Some(name.rsplit_once('.').map_or(ROOT, |(parent, _)| parent))
}

/// Configuration of one logger in the tree
#[derive(Debug, Clone)]
pub(crate) struct LoggerState {
    pub level: Level,
    pub handlers: Vec<Arc<Handler>>,
    pub propagate: bool,
}

impl Default for LoggerState {
    fn default() -> Self {
        Self {
            level: Level::NotSet,
            handlers: Vec::new(),
            propagate: true,
        }
    }
}

impl LoggerState {
    /// Attach a handler, replacing any handler already attached under that name
    pub fn attach(&mut self, handler: Arc<Handler>) {
        match self
            .handlers
            .iter()
            .position(|h| h.name() == handler.name())
        {
            Some(pos) => self.handlers[pos] = handler,
            None => self.handlers.push(handler),
        }
    }
}

/// Handle to a named logger in a [`LogRegistry`]
///
/// Handles are cheap to clone; all state lives in the registry, so two
/// handles with the same name always agree.
#[derive(Clone)]
pub struct Logger {
    name: String,
    registry: LogRegistry,
}

impl Logger {
    pub(crate) fn new(name: &str, registry: LogRegistry) -> Self {
        Self {
            name: normalize_name(name),
            registry,
        }
    }

    /// Dotted name; empty for the root logger
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn registry(&self) -> &LogRegistry {
        &self.registry
    }

    /// Level set on this logger itself (`NotSet` means inherited)
    pub fn level(&self) -> Level {
        self.registry.logger_level(&self.name)
    }

    pub fn set_level(&self, level: impl IntoLevel) -> Result<()> {
        let level = level.into_level()?;
        self.registry.set_logger_level(&self.name, level);
        Ok(())
    }

    /// Level this logger actually filters at, after inheritance
    pub fn effective_level(&self) -> Level {
        self.registry.effective_level(&self.name)
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.effective_level()
    }

    /// Whether records continue to ancestor loggers' handlers
    pub fn propagate(&self) -> bool {
        self.registry.logger_propagate(&self.name)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.registry.set_logger_propagate(&self.name, propagate);
    }

    /// Names of the handlers attached directly to this logger
    pub fn handler_names(&self) -> Vec<HandlerName> {
        self.registry.logger_handler_names(&self.name)
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        if !self.is_enabled_for(level) {
            return;
        }
        let caller = Location::caller();
        let record = Record::new(level, self.name.as_str(), message.to_string())
            .with_location(caller.file(), caller.line());
        self.registry.dispatch(&record);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Level::Warning, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Level::Critical, message);
    }

    /// Flush every handler attached directly to this logger
    pub fn flush(&self) {
        self.registry.flush_logger(&self.name);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("propagate", &self.propagate())
            .finish()
    }
}
