//! Record filters
//!
//! A filter is a predicate that decides whether a record reaches a handler.
//! Filters can be registered directly, or built from a named factory so that
//! configuration files can refer to them by string.

use std::fmt;
use std::sync::Arc;

use crate::level::Level;
use crate::record::Record;

/// Predicate over records
pub trait RecordFilter: Send + Sync {
    fn filter(&self, record: &Record) -> bool;
}

impl<F> RecordFilter for F
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn filter(&self, record: &Record) -> bool {
        self(record)
    }
}

/// Zero-argument constructor for a filter
pub type FilterFactory = Arc<dyn Fn() -> Arc<dyn RecordFilter> + Send + Sync>;

/// Admits records of exactly one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactLevel(pub Level);

impl RecordFilter for ExactLevel {
    fn filter(&self, record: &Record) -> bool {
        record.level == self.0
    }
}

/// Admits records from one logger and its descendants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    prefix: String,
}

impl NameFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl RecordFilter for NameFilter {
    fn filter(&self, record: &Record) -> bool {
        if self.prefix.is_empty() || record.logger == self.prefix {
            return true;
        }
        record
            .logger
            .strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// How a handler or registration refers to a filter
#[derive(Clone)]
pub enum FilterRef {
    /// A ready-made filter
    Instance(Arc<dyn RecordFilter>),
    /// A registered filter name, or failing that a filter factory name
    Named(String),
}

impl FilterRef {
    pub fn instance(filter: impl RecordFilter + 'static) -> Self {
        FilterRef::Instance(Arc::new(filter))
    }
}

impl fmt::Debug for FilterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRef::Instance(_) => f.write_str("FilterRef::Instance(..)"),
            FilterRef::Named(name) => write!(f, "FilterRef::Named({:?})", name),
        }
    }
}

impl From<&str> for FilterRef {
    fn from(name: &str) -> Self {
        FilterRef::Named(name.to_string())
    }
}

impl From<String> for FilterRef {
    fn from(name: String) -> Self {
        FilterRef::Named(name)
    }
}

/// Factories available to every registry under these names
pub(crate) fn builtin_factories() -> Vec<(&'static str, FilterFactory)> {
    fn exact(level: Level) -> FilterFactory {
        Arc::new(move || Arc::new(ExactLevel(level)) as Arc<dyn RecordFilter>)
    }
    vec![
        ("debug_only", exact(Level::Debug)),
        ("info_only", exact(Level::Info)),
        ("warning_only", exact(Level::Warning)),
        ("error_only", exact(Level::Error)),
        ("critical_only", exact(Level::Critical)),
    ]
}
