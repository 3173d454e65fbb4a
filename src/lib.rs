//! logroute - process-wide logging setup with level-based routing
//!
//! A [`LogRegistry`] owns named formatters, filters and handlers, and wires
//! them onto a tree of dotted-name loggers. The standard routing sends
//! everything to the console, exactly-INFO records to `info.log`, and
//! WARNING and above to `errors.log`, both rotating at 10 MiB with 20
//! backups.
//!
//! ```no_run
//! use logroute::Level;
//!
//! logroute::init_logging("/var/log/myapp", "info")?;
//! let log = logroute::get_logger("services.db", Level::Info, None)?;
//! log.warning("connection pool exhausted");
//!
//! // tracing events are routed the same way
//! tracing::error!(target: "services::db", "query failed");
//! # Ok::<(), logroute::LogError>(())
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod global;
pub mod handler;
pub mod layer;
pub mod level;
pub mod logger;
pub mod names;
pub mod record;
pub mod registry;
pub mod sink;

pub use config::LoggingConfig;
pub use error::{LogError, RefKind, Result};
pub use filter::{ExactLevel, FilterRef, NameFilter, RecordFilter};
pub use formatter::Formatter;
pub use global::{
    get_logger, init_from_config, init_logging, new_filter, new_formatter, new_handler, registry,
    setup_logger,
};
pub use handler::{Handler, HandlerSpec};
pub use layer::RoutingLayer;
pub use level::{IntoLevel, Level};
pub use logger::Logger;
pub use names::{FilterName, FormatterName, HandlerName};
pub use record::Record;
pub use registry::{LogRegistry, RegistryBuilder, DEFAULT_HANDLERS};
pub use sink::{ConsoleSink, MemorySink, RotatingFileSink, Sink, SinkRef};
