//! Output sinks
//!
//! A sink is where formatted records end up: the console, a rotating file,
//! or an in-memory buffer. Handlers own exactly one sink each.

mod buffer;
mod console;
mod file_writer;
mod retention;

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};
use crate::record::Record;

pub use buffer::{CapturedLine, MemorySink};
pub use console::{ConsoleSink, Stream};
pub use file_writer::{
    RotatingFileGuard, RotatingFileSink, RotatingFileWriter, DEFAULT_BACKUP_COUNT,
    DEFAULT_MAX_BYTES,
};
pub use retention::{backup_path, existing_backups, prune_backups};

/// Destination for formatted records
pub trait Sink: Send + Sync {
    /// Write one formatted line; the sink supplies the line terminator
    fn write_line(&self, record: &Record, line: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// How a handler specification refers to its sink
#[derive(Clone)]
pub enum SinkRef {
    /// A ready-made sink
    Instance(Arc<dyn Sink>),
    /// A registered sink factory, fed with the handler's parameters
    Named(String),
}

impl SinkRef {
    pub fn instance(sink: impl Sink + 'static) -> Self {
        SinkRef::Instance(Arc::new(sink))
    }
}

impl fmt::Debug for SinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkRef::Instance(_) => f.write_str("SinkRef::Instance(..)"),
            SinkRef::Named(name) => write!(f, "SinkRef::Named({:?})", name),
        }
    }
}

impl From<Arc<dyn Sink>> for SinkRef {
    fn from(sink: Arc<dyn Sink>) -> Self {
        SinkRef::Instance(sink)
    }
}

impl From<&str> for SinkRef {
    fn from(name: &str) -> Self {
        SinkRef::Named(name.to_string())
    }
}

/// A single sink construction parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Sink construction parameters, forwarded untouched to the sink factory
pub type SinkParams = BTreeMap<String, ParamValue>;

/// Everything a sink factory gets to build a sink
#[derive(Debug, Clone, Copy)]
pub struct SinkContext<'a> {
    /// Name of the factory being invoked
    pub factory: &'a str,
    /// Registry log directory; relative file names resolve against it
    pub log_dir: &'a Path,
    /// Handler-specific parameters
    pub params: &'a SinkParams,
}

impl SinkContext<'_> {
    /// Optional string parameter
    pub fn str_param(&self, key: &str) -> Result<Option<&str>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Str(value)) => Ok(Some(value)),
            Some(other) => Err(self.invalid(key, format!("expected a string, got {:?}", other))),
        }
    }

    /// Optional non-negative integer parameter
    pub fn u64_param(&self, key: &str) -> Result<Option<u64>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(value)) => u64::try_from(*value)
                .map(Some)
                .map_err(|_| self.invalid(key, format!("must not be negative, got {}", value))),
            Some(ParamValue::Str(value)) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, format!("expected an integer, got {:?}", value))),
            Some(other) => Err(self.invalid(key, format!("expected an integer, got {:?}", other))),
        }
    }

    /// Resolve a file name against the log directory
    pub fn resolve_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.log_dir.join(path)
        }
    }

    fn invalid(&self, key: &str, reason: String) -> LogError {
        LogError::invalid_param(self.factory, key, reason)
    }
}

/// Constructor for a sink, looked up by name
pub type SinkFactory = Arc<dyn Fn(&SinkContext<'_>) -> Result<Arc<dyn Sink>> + Send + Sync>;

fn console_factory(ctx: &SinkContext<'_>) -> Result<Arc<dyn Sink>> {
    let stream = match ctx.str_param("stream")? {
        Some(stream) => stream.parse()?,
        None => Stream::Stdout,
    };
    Ok(Arc::new(ConsoleSink::new(stream)))
}

fn rotating_file_factory(ctx: &SinkContext<'_>) -> Result<Arc<dyn Sink>> {
    let filename = ctx
        .str_param("filename")?
        .ok_or_else(|| ctx.invalid("filename", "is required".to_string()))?;

    if let Some(encoding) = ctx.str_param("encoding")? {
        let normalized = encoding.to_ascii_lowercase().replace(['-', '_'], "");
        if normalized != "utf8" {
            return Err(ctx.invalid(
                "encoding",
                format!("only utf-8 is supported, got {:?}", encoding),
            ));
        }
    }

    let max_bytes = ctx.u64_param("max_bytes")?.unwrap_or(DEFAULT_MAX_BYTES);
    let backup_count = match ctx.u64_param("backup_count")? {
        Some(count) => u32::try_from(count)
            .map_err(|_| ctx.invalid("backup_count", format!("{} is too large", count)))?,
        None => DEFAULT_BACKUP_COUNT,
    };

    let sink = RotatingFileSink::open(ctx.resolve_path(filename), max_bytes, backup_count)?;
    Ok(Arc::new(sink))
}

/// Factories available to every registry under these names
pub(crate) fn builtin_factories() -> Vec<(&'static str, SinkFactory)> {
    vec![
        ("console", Arc::new(console_factory) as SinkFactory),
        ("rotating_file", Arc::new(rotating_file_factory) as SinkFactory),
    ]
}
