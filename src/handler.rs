//! Handlers
//!
//! A handler binds one sink to one formatter, a minimum level and any number
//! of filters.

use std::fmt;
use std::sync::Arc;

use crate::filter::{FilterRef, RecordFilter};
use crate::formatter::Formatter;
use crate::level::Level;
use crate::names::{FormatterName, HandlerName};
use crate::record::Record;
use crate::sink::{ParamValue, Sink, SinkParams, SinkRef};

/// Description of a handler, resolved by the registry into a [`Handler`]
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    /// Sink instance or sink factory name
    pub sink: SinkRef,
    /// Minimum level the handler accepts
    pub level: Level,
    /// Formatter name; must already be registered
    pub formatter: FormatterName,
    /// Filters attached in order
    pub filters: Vec<FilterRef>,
    /// Parameters forwarded to the sink factory
    pub params: SinkParams,
}

impl HandlerSpec {
    pub fn new(sink: impl Into<SinkRef>, formatter: impl Into<FormatterName>) -> Self {
        Self {
            sink: sink.into(),
            level: Level::NotSet,
            formatter: formatter.into(),
            filters: Vec::new(),
            params: SinkParams::new(),
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn filter(mut self, filter: impl Into<FilterRef>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A live output: sink + formatter + level + filters
pub struct Handler {
    name: HandlerName,
    level: Level,
    formatter: Arc<Formatter>,
    filters: Vec<Arc<dyn RecordFilter>>,
    sink: Arc<dyn Sink>,
}

impl Handler {
    pub fn new(
        name: HandlerName,
        level: Level,
        formatter: Arc<Formatter>,
        filters: Vec<Arc<dyn RecordFilter>>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            name,
            level,
            formatter,
            filters,
            sink,
        }
    }

    pub fn name(&self) -> &HandlerName {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Whether a record passes this handler's level and filters
    pub fn accepts(&self, record: &Record) -> bool {
        record.level >= self.level && self.filters.iter().all(|f| f.filter(record))
    }

    /// Format and emit a record if it is accepted
    ///
    /// Returns whether the record was emitted. Sink failures are reported on
    /// stderr rather than returned, so a full disk never fails a log call.
    pub fn handle(&self, record: &Record) -> bool {
        if !self.accepts(record) {
            return false;
        }
        let line = self.formatter.format(record);
        if let Err(e) = self.sink.write_line(record, &line) {
            eprintln!("logging error in {}: {}", self.name, e);
        }
        true
    }

    pub fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            eprintln!("logging error flushing {}: {}", self.name, e);
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("formatter", self.formatter.name())
            .field("filters", &self.filters.len())
            .finish()
    }
}
