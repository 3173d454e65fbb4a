//! The logging registry
//!
//! A [`LogRegistry`] owns every formatter, filter and handler by name, plus
//! the logger tree they are attached to. Construction installs the standard
//! routing on the root logger:
//!
//! | handler              | level   | filter        | formatter |
//! |----------------------|---------|---------------|-----------|
//! | `console_handler`    | DEBUG   | -             | detail    |
//! | `info_file_handler`  | INFO    | exactly INFO  | simple    |
//! | `error_file_handler` | WARNING | -             | detail    |

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{LogError, RefKind, Result};
use crate::filter::{self, ExactLevel, FilterFactory, FilterRef, RecordFilter};
use crate::formatter::{Formatter, DETAIL_TEMPLATE, SIMPLE_TEMPLATE};
use crate::handler::{Handler, HandlerSpec};
use crate::layer::RoutingLayer;
use crate::level::{IntoLevel, Level};
use crate::logger::{self, Logger, LoggerState, ROOT};
use crate::names::{FilterName, FormatterName, HandlerName};
use crate::record::Record;
use crate::sink::{
    self, ConsoleSink, ParamValue, Sink, SinkContext, SinkFactory, SinkRef, DEFAULT_BACKUP_COUNT,
    DEFAULT_MAX_BYTES,
};

/// File written by `info_file_handler`
pub const INFO_LOG_FILE: &str = "info.log";

/// File written by `error_file_handler`
pub const ERROR_LOG_FILE: &str = "errors.log";

pub const CONSOLE_HANDLER: &str = "console_handler";
pub const INFO_FILE_HANDLER: &str = "info_file_handler";
pub const ERROR_FILE_HANDLER: &str = "error_file_handler";

/// Handlers attached when no handler list is given
pub const DEFAULT_HANDLERS: [&str; 3] = [CONSOLE_HANDLER, INFO_FILE_HANDLER, ERROR_FILE_HANDLER];

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct RegistryInner {
    log_dir: PathBuf,
    level: Level,
    formatters: RwLock<HashMap<FormatterName, Arc<Formatter>>>,
    filters: RwLock<HashMap<FilterName, Arc<dyn RecordFilter>>>,
    filter_factories: RwLock<HashMap<String, FilterFactory>>,
    sink_factories: RwLock<HashMap<String, SinkFactory>>,
    handlers: RwLock<HashMap<HandlerName, Arc<Handler>>>,
    loggers: RwLock<HashMap<String, LoggerState>>,
}

/// Builder for a [`LogRegistry`]
pub struct RegistryBuilder {
    log_dir: PathBuf,
    level: Level,
    console: Option<Arc<dyn Sink>>,
    max_bytes: u64,
    backup_count: u32,
}

impl RegistryBuilder {
    /// Minimum level of the root logger (default INFO)
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Replace the sink behind `console_handler` (default stdout)
    pub fn console(mut self, sink: Arc<dyn Sink>) -> Self {
        self.console = Some(sink);
        self
    }

    /// Rotation threshold and backup count of the built-in file handlers
    pub fn rotation(mut self, max_bytes: u64, backup_count: u32) -> Self {
        self.max_bytes = max_bytes;
        self.backup_count = backup_count;
        self
    }

    /// Create the log directory and the built-in formatters, filters and handlers
    pub fn build(self) -> Result<LogRegistry> {
        fs::create_dir_all(&self.log_dir)?;

        let registry = LogRegistry {
            inner: Arc::new(RegistryInner {
                log_dir: self.log_dir,
                level: self.level,
                formatters: RwLock::new(HashMap::new()),
                filters: RwLock::new(HashMap::new()),
                filter_factories: RwLock::new(HashMap::new()),
                sink_factories: RwLock::new(HashMap::new()),
                handlers: RwLock::new(HashMap::new()),
                loggers: RwLock::new(HashMap::new()),
            }),
        };

        {
            let mut factories = write(&registry.inner.filter_factories);
            for (name, factory) in filter::builtin_factories() {
                factories.insert(name.to_string(), factory);
            }
        }
        {
            let mut factories = write(&registry.inner.sink_factories);
            for (name, factory) in sink::builtin_factories() {
                factories.insert(name.to_string(), factory);
            }
        }

        registry.register_formatter("simple", SIMPLE_TEMPLATE)?;
        registry.register_formatter("detail", DETAIL_TEMPLATE)?;
        registry.register_filter("debug", FilterRef::instance(ExactLevel(Level::Debug)))?;
        registry.register_filter("info", FilterRef::instance(ExactLevel(Level::Info)))?;

        let console = self
            .console
            .unwrap_or_else(|| Arc::new(ConsoleSink::stdout()) as Arc<dyn Sink>);
        registry.register_handler(
            CONSOLE_HANDLER,
            HandlerSpec::new(console, "detail").level(Level::Debug),
        )?;
        registry.register_handler(
            INFO_FILE_HANDLER,
            file_handler_spec(INFO_LOG_FILE, self.max_bytes, self.backup_count)
                .level(Level::Info)
                .filter("info_filter"),
        )?;
        registry.register_handler(
            ERROR_FILE_HANDLER,
            HandlerSpec {
                formatter: FormatterName::new("detail"),
                ..file_handler_spec(ERROR_LOG_FILE, self.max_bytes, self.backup_count)
            }
            .level(Level::Warning),
        )?;

        registry.attach(ROOT, registry.inner.level, &DEFAULT_HANDLERS);
        tracing::debug!(
            log_dir = %registry.inner.log_dir.display(),
            level = %registry.inner.level,
            "logging registry ready"
        );
        Ok(registry)
    }
}

fn file_handler_spec(file: &str, max_bytes: u64, backup_count: u32) -> HandlerSpec {
    HandlerSpec::new("rotating_file", "simple")
        .param("filename", file)
        .param("max_bytes", ParamValue::Int(max_bytes as i64))
        .param("backup_count", ParamValue::Int(i64::from(backup_count)))
        .param("encoding", "utf8")
}

/// Registry of formatters, filters, handlers and the logger tree
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct LogRegistry {
    inner: Arc<RegistryInner>,
}

impl LogRegistry {
    /// Build a registry with the standard routing under `log_dir`
    pub fn new(log_dir: impl AsRef<Path>, level: impl IntoLevel) -> Result<Self> {
        let level = level.into_level()?;
        Self::builder(log_dir).level(level).build()
    }

    pub fn builder(log_dir: impl AsRef<Path>) -> RegistryBuilder {
        RegistryBuilder {
            log_dir: log_dir.as_ref().to_path_buf(),
            level: Level::Info,
            console: None,
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.inner.log_dir
    }

    /// Root level the registry was built with
    pub fn level(&self) -> Level {
        self.inner.level
    }

    /// Define or replace a formatter
    pub fn register_formatter(
        &self,
        name: impl Into<FormatterName>,
        template: impl Into<String>,
    ) -> Result<()> {
        self.insert_formatter(Formatter::new(name, template)?);
        Ok(())
    }

    /// Define or replace a formatter with a custom `asctime` format
    pub fn register_formatter_with_datefmt(
        &self,
        name: impl Into<FormatterName>,
        template: impl Into<String>,
        datefmt: impl Into<String>,
    ) -> Result<()> {
        self.insert_formatter(Formatter::new(name, template)?.with_datefmt(datefmt));
        Ok(())
    }

    fn insert_formatter(&self, formatter: Formatter) {
        let name = formatter.name().clone();
        write(&self.inner.formatters).insert(name.clone(), Arc::new(formatter));
        tracing::debug!(formatter = %name, "registered formatter");
    }

    /// Define or replace a filter from an instance or a named reference
    pub fn register_filter(
        &self,
        name: impl Into<FilterName>,
        filter: impl Into<FilterRef>,
    ) -> Result<()> {
        let name = name.into();
        let filter = self.resolve_filter(&filter.into())?;
        write(&self.inner.filters).insert(name.clone(), filter);
        tracing::debug!(filter = %name, "registered filter");
        Ok(())
    }

    /// Make a filter constructor available to named references
    pub fn register_filter_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn RecordFilter> + Send + Sync + 'static,
    {
        write(&self.inner.filter_factories).insert(name.into(), Arc::new(factory));
    }

    /// Make a sink constructor available to handler specifications
    pub fn register_sink_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SinkContext<'_>) -> Result<Arc<dyn Sink>> + Send + Sync + 'static,
    {
        write(&self.inner.sink_factories).insert(name.into(), Arc::new(factory));
    }

    /// Build a handler from its specification and store it under `name`
    ///
    /// The formatter is resolved first, so an unknown formatter fails before
    /// any sink (and any file) is created.
    pub fn register_handler(&self, name: impl Into<HandlerName>, spec: HandlerSpec) -> Result<()> {
        let name = name.into();

        let formatter = self
            .formatter(spec.formatter.as_str())
            .ok_or_else(|| LogError::unknown(RefKind::Formatter, spec.formatter.as_str()))?;

        let filters = spec
            .filters
            .iter()
            .map(|filter| self.resolve_filter(filter))
            .collect::<Result<Vec<_>>>()?;

        let sink = match &spec.sink {
            SinkRef::Instance(sink) => Arc::clone(sink),
            SinkRef::Named(factory_name) => {
                let factory = read(&self.inner.sink_factories)
                    .get(factory_name)
                    .cloned()
                    .ok_or_else(|| LogError::unknown(RefKind::SinkFactory, factory_name))?;
                factory(&SinkContext {
                    factory: factory_name,
                    log_dir: &self.inner.log_dir,
                    params: &spec.params,
                })?
            }
        };

        let handler = Handler::new(name.clone(), spec.level, formatter, filters, sink);
        write(&self.inner.handlers).insert(name.clone(), Arc::new(handler));
        tracing::debug!(handler = %name, level = %spec.level, "registered handler");
        Ok(())
    }

    fn resolve_filter(&self, filter: &FilterRef) -> Result<Arc<dyn RecordFilter>> {
        match filter {
            FilterRef::Instance(filter) => Ok(Arc::clone(filter)),
            FilterRef::Named(name) => {
                if let Some(filter) = self.filter(name) {
                    return Ok(filter);
                }
                let factory = read(&self.inner.filter_factories).get(name).cloned();
                match factory {
                    Some(factory) => Ok(factory()),
                    None => Err(LogError::unknown(RefKind::Filter, name)),
                }
            }
        }
    }

    pub fn formatter(&self, name: &str) -> Option<Arc<Formatter>> {
        read(&self.inner.formatters)
            .get(&FormatterName::new(name))
            .cloned()
    }

    pub fn filter(&self, name: &str) -> Option<Arc<dyn RecordFilter>> {
        read(&self.inner.filters).get(&FilterName::new(name)).cloned()
    }

    pub fn handler(&self, name: &str) -> Option<Arc<Handler>> {
        read(&self.inner.handlers)
            .get(&HandlerName::new(name))
            .cloned()
    }

    /// Names of all registered handlers, sorted
    pub fn handler_names(&self) -> Vec<HandlerName> {
        let mut names: Vec<HandlerName> = read(&self.inner.handlers).keys().cloned().collect();
        names.sort();
        names
    }

    /// Handle to a logger, without changing its configuration
    pub fn logger(&self, name: &str) -> Logger {
        Logger::new(name, self.clone())
    }

    pub fn root(&self) -> Logger {
        self.logger(ROOT)
    }

    /// Configure a logger: set its level, attach handlers and stop propagation
    ///
    /// `handlers` defaults to [`DEFAULT_HANDLERS`]. Unknown handler names are
    /// skipped with a warning. Attaching a handler that is already attached
    /// under the same name replaces it rather than adding a second copy.
    pub fn attach_logger(
        &self,
        logger: &Logger,
        level: impl IntoLevel,
        handlers: Option<&[&str]>,
    ) -> Result<Logger> {
        let level = level.into_level()?;
        let names = handlers.unwrap_or(&DEFAULT_HANDLERS);
        self.attach(logger.name(), level, names);
        Ok(logger.clone())
    }

    /// Look up or create a logger and configure it with [`attach_logger`](Self::attach_logger)
    pub fn get_logger(
        &self,
        name: &str,
        level: impl IntoLevel,
        handlers: Option<&[&str]>,
    ) -> Result<Logger> {
        let level = level.into_level()?;
        let logger = self.logger(name);
        self.attach_logger(&logger, level, handlers)
    }

    /// Configure a logger with exactly the given handlers
    ///
    /// Unlike [`attach_logger`](Self::attach_logger), handlers already on the
    /// logger are detached first. Unknown handler names are skipped.
    pub fn configure_logger(
        &self,
        name: &str,
        level: impl IntoLevel,
        handlers: Option<&[&str]>,
        propagate: bool,
    ) -> Result<Logger> {
        let level = level.into_level()?;
        let logger = self.logger(name);
        self.attach_with(logger.name(), level, handlers.unwrap_or(&DEFAULT_HANDLERS), true);
        logger.set_propagate(propagate);
        Ok(logger)
    }

    fn attach(&self, name: &str, level: Level, handler_names: &[&str]) {
        self.attach_with(name, level, handler_names, false);
    }

    fn attach_with(&self, name: &str, level: Level, handler_names: &[&str], replace: bool) {
        // Resolve names first so the handler and logger locks are never held together
        let mut found = Vec::with_capacity(handler_names.len());
        let mut skipped = Vec::new();
        {
            let handlers = read(&self.inner.handlers);
            for handler_name in handler_names {
                let handler_name = HandlerName::new(*handler_name);
                match handlers.get(&handler_name) {
                    Some(handler) => found.push(Arc::clone(handler)),
                    None => skipped.push(handler_name),
                }
            }
        }

        // Apply level and handlers to the logger's state
        {
            let mut loggers = write(&self.inner.loggers);
            let state = loggers.entry(name.to_string()).or_default();
            state.level = level;
            if replace {
                state.handlers.clear();
            }
            for handler in found {
                state.attach(handler);
            }
            state.propagate = false;
        }

        // Kept at debug so it stays out of errors.log
        for handler_name in skipped {
            tracing::debug!(logger = name, handler = %handler_name, "unknown handler, skipped");
        }
    }

    pub(crate) fn logger_level(&self, name: &str) -> Level {
        read(&self.inner.loggers)
            .get(name)
            .map_or(Level::NotSet, |state| state.level)
    }

    pub(crate) fn set_logger_level(&self, name: &str, level: Level) {
        write(&self.inner.loggers)
            .entry(name.to_string())
            .or_default()
            .level = level;
    }

    pub(crate) fn effective_level(&self, name: &str) -> Level {
        effective_level(&read(&self.inner.loggers), name)
    }

    /// Whether a record at `level` from logger `name` would be emitted
    pub fn is_enabled_for(&self, name: &str, level: Level) -> bool {
        level >= self.effective_level(&logger::normalize_name(name))
    }

    pub(crate) fn logger_propagate(&self, name: &str) -> bool {
        read(&self.inner.loggers)
            .get(name)
            .map_or(true, |state| state.propagate)
    }

    pub(crate) fn set_logger_propagate(&self, name: &str, propagate: bool) {
        write(&self.inner.loggers)
            .entry(name.to_string())
            .or_default()
            .propagate = propagate;
    }

    pub(crate) fn logger_handler_names(&self, name: &str) -> Vec<HandlerName> {
        read(&self.inner.loggers)
            .get(name)
            .map(|state| state.handlers.iter().map(|h| h.name().clone()).collect())
            .unwrap_or_default()
    }

    /// Route a record through its logger and, while propagation allows,
    /// the logger's ancestors
    pub fn dispatch(&self, record: &Record) {
        let handlers = {
            let loggers = read(&self.inner.loggers);
            if record.level < effective_level(&loggers, &record.logger) {
                return;
            }

            let mut handlers = Vec::new();
            let mut current = Some(record.logger.as_str());
            while let Some(name) = current {
                if let Some(state) = loggers.get(name) {
                    handlers.extend(state.handlers.iter().cloned());
                    if !state.propagate {
                        break;
                    }
                }
                current = logger::parent(name);
            }
            handlers
        };

        for handler in handlers {
            handler.handle(record);
        }
    }

    pub(crate) fn flush_logger(&self, name: &str) {
        let handlers: Vec<Arc<Handler>> = read(&self.inner.loggers)
            .get(name)
            .map(|state| state.handlers.clone())
            .unwrap_or_default();
        for handler in handlers {
            handler.flush();
        }
    }

    /// Flush every registered handler
    pub fn flush(&self) {
        let handlers: Vec<Arc<Handler>> = read(&self.inner.handlers).values().cloned().collect();
        for handler in handlers {
            handler.flush();
        }
    }

    /// A `tracing` layer that routes events through this registry
    pub fn layer(&self) -> RoutingLayer {
        RoutingLayer::new(self.clone())
    }
}

impl std::fmt::Debug for LogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRegistry")
            .field("log_dir", &self.inner.log_dir)
            .field("level", &self.inner.level)
            .field("handlers", &self.handler_names())
            .finish()
    }
}

fn effective_level(loggers: &HashMap<String, LoggerState>, name: &str) -> Level {
    let mut current = Some(name);
    while let Some(name) = current {
        if let Some(state) = loggers.get(name) {
            if state.level != Level::NotSet {
                return state.level;
            }
        }
        current = logger::parent(name);
    }
    Level::NotSet
}
