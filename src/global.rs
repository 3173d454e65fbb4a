//! Process-wide registry
//!
//! Most programs want one registry for their whole lifetime. [`init_logging`]
//! creates it on first call; every later call returns that same registry and
//! ignores its arguments. The other functions here fail with
//! [`LogError::NotInitialized`] until then.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::error::{LogError, Result};
use crate::filter::FilterRef;
use crate::handler::HandlerSpec;
use crate::level::IntoLevel;
use crate::logger::Logger;
use crate::names::{FilterName, FormatterName, HandlerName};
use crate::registry::LogRegistry;

static REGISTRY: OnceLock<LogRegistry> = OnceLock::new();

/// Create the process-wide registry, or return the existing one
///
/// The first successful call wins: a later call with a different directory
/// or level returns the original registry unchanged.
pub fn init_logging(log_dir: impl AsRef<Path>, log_level: impl IntoLevel) -> Result<LogRegistry> {
    if let Some(registry) = REGISTRY.get() {
        return Ok(registry.clone());
    }
    let registry = LogRegistry::new(log_dir, log_level)?;
    Ok(install(registry))
}

/// Like [`init_logging`], but built from a configuration file
pub fn init_from_config(path: impl AsRef<Path>) -> anyhow::Result<LogRegistry> {
    if let Some(registry) = REGISTRY.get() {
        return Ok(registry.clone());
    }
    let path = path.as_ref();
    let config = LoggingConfig::load(path)?;
    let registry = LogRegistry::from_config(&config)
        .with_context(|| format!("Failed to apply logging config {}", path.display()))?;
    Ok(install(registry))
}

fn install(registry: LogRegistry) -> LogRegistry {
    let mut won = false;
    let registry = REGISTRY
        .get_or_init(|| {
            won = true;
            registry
        })
        .clone();

    if won {
        install_subscriber(&registry);
    }
    registry
}

/// Route `tracing` events through `registry`, unless the host already owns
/// the global subscriber. That case is reported as a warning on the root
/// logger so it reaches the console and errors.log; the host can add
/// `registry.layer()` to its own subscriber.
fn install_subscriber(registry: &LogRegistry) -> bool {
    let installed = tracing_subscriber::registry()
        .with(registry.layer())
        .try_init()
        .is_ok();
    if !installed {
        registry
            .root()
            .warning("global tracing subscriber already set, tracing events are not routed here");
    }
    installed
}

/// The process-wide registry
pub fn registry() -> Result<LogRegistry> {
    REGISTRY.get().cloned().ok_or(LogError::NotInitialized)
}

/// Configure an existing logger in the process-wide registry
pub fn setup_logger(
    logger: &Logger,
    log_level: impl IntoLevel,
    handlers: Option<&[&str]>,
) -> Result<Logger> {
    registry()?.attach_logger(logger, log_level, handlers)
}

/// Look up a logger by name in the process-wide registry and configure it
pub fn get_logger(name: &str, log_level: impl IntoLevel, handlers: Option<&[&str]>) -> Result<Logger> {
    registry()?.get_logger(name, log_level, handlers)
}

/// Register a formatter in the process-wide registry
pub fn new_formatter(name: impl Into<FormatterName>, template: impl Into<String>) -> Result<()> {
    registry()?.register_formatter(name, template)
}

/// Register a filter in the process-wide registry
pub fn new_filter(name: impl Into<FilterName>, filter: impl Into<FilterRef>) -> Result<()> {
    registry()?.register_filter(name, filter)
}

/// Register a handler in the process-wide registry
pub fn new_handler(name: impl Into<HandlerName>, spec: HandlerSpec) -> Result<()> {
    registry()?.register_handler(name, spec)
}
