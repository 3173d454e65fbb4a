//! Declarative logging configuration
//!
//! A [`LoggingConfig`] describes extra formatters, filters, handlers and
//! loggers on top of the built-in routing. It can be written in TOML or JSON:
//!
//! ```toml
//! log_dir = "/var/log/myapp"
//! level = "info"
//!
//! [formatters.brief]
//! format = "%(levelname)s %(name)s: %(message)s"
//!
//! [handlers.audit]
//! sink = "rotating_file"
//! level = "debug"
//! formatter = "brief"
//! filters = ["debug_only"]
//! filename = "audit.log"
//! backup_count = 5
//!
//! [loggers."services.auth"]
//! level = "debug"
//! handlers = ["console", "audit"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::filter::FilterRef;
use crate::handler::HandlerSpec;
use crate::level::Level;
use crate::logger::ROOT;
use crate::registry::LogRegistry;
use crate::sink::{SinkParams, SinkRef};

/// Logger key that refers to the root logger
pub const ROOT_KEY: &str = "root";

/// Formatter section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Template, e.g. `%(asctime)s %(message)s`
    pub format: String,

    /// strftime format for `%(asctime)s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,
}

/// Filter section; filters are built from named factories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub factory: String,
}

/// Handler section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Sink factory name: "console", "rotating_file" or a registered one
    pub sink: String,

    /// Minimum level (default: everything)
    #[serde(default)]
    pub level: Level,

    pub formatter: String,

    #[serde(default)]
    pub filters: Vec<String>,

    /// Remaining keys are passed to the sink factory
    #[serde(flatten)]
    pub params: SinkParams,
}

/// Logger section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_logger_level")]
    pub level: Level,

    /// Handler names; the standard three when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handlers: Option<Vec<String>>,

    #[serde(default)]
    pub propagate: bool,
}

/// Complete logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the built-in log files and relative handler file names
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Root logger level
    #[serde(default = "default_logger_level")]
    pub level: Level,

    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,

    #[serde(default)]
    pub filters: BTreeMap<String, FilterConfig>,

    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,

    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,
}

fn default_logger_level() -> Level {
    Level::Info
}

/// Default log directory: the platform data directory, or ./logs
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("logroute").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            level: default_logger_level(),
            formatters: BTreeMap::new(),
            filters: BTreeMap::new(),
            handlers: BTreeMap::new(),
            loggers: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Load a configuration file; `.json` files are JSON, anything else TOML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read logging config {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).context("Failed to parse logging config as JSON")
        } else {
            toml::from_str(&content).context("Failed to parse logging config as TOML")
        }
    }

    /// Register everything this configuration describes
    ///
    /// Sections are applied in dependency order: formatters, filters,
    /// handlers, then loggers.
    pub fn apply(&self, registry: &LogRegistry) -> std::result::Result<(), LogError> {
        for (name, formatter) in &self.formatters {
            match &formatter.datefmt {
                Some(datefmt) => registry.register_formatter_with_datefmt(
                    name.as_str(),
                    formatter.format.as_str(),
                    datefmt.as_str(),
                )?,
                None => registry.register_formatter(name.as_str(), formatter.format.as_str())?,
            }
        }

        for (name, filter) in &self.filters {
            registry.register_filter(name.as_str(), FilterRef::Named(filter.factory.clone()))?;
        }

        for (name, handler) in &self.handlers {
            let spec = HandlerSpec {
                sink: SinkRef::Named(handler.sink.clone()),
                level: handler.level,
                formatter: handler.formatter.as_str().into(),
                filters: handler
                    .filters
                    .iter()
                    .map(|f| FilterRef::Named(f.clone()))
                    .collect(),
                params: handler.params.clone(),
            };
            registry.register_handler(name.as_str(), spec)?;
        }

        for (name, logger) in &self.loggers {
            let name = if name == ROOT_KEY { ROOT } else { name.as_str() };
            let handlers: Option<Vec<&str>> = logger
                .handlers
                .as_ref()
                .map(|names| names.iter().map(String::as_str).collect());
            registry.configure_logger(name, logger.level, handlers.as_deref(), logger.propagate)?;
        }

        Ok(())
    }
}

impl LogRegistry {
    /// Build a registry from a configuration
    pub fn from_config(config: &LoggingConfig) -> std::result::Result<Self, LogError> {
        let registry = LogRegistry::new(&config.log_dir, config.level)?;
        config.apply(&registry)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::HandlerName;
    use crate::sink::ParamValue;
    use std::fs;
    use tempfile::TempDir;

    fn sample_toml(log_dir: &Path) -> String {
        format!(
            r#"
log_dir = "{}"
level = "debug"

[formatters.brief]
format = "%(levelname)s %(name)s: %(message)s"

[formatters.clock]
format = "%(asctime)s %(message)s"
datefmt = "%H:%M"

[filters.only_debug]
factory = "debug_only"

[handlers.audit]
sink = "rotating_file"
level = "debug"
formatter = "brief"
filters = ["only_debug"]
filename = "audit.log"
max_bytes = 4096
backup_count = 2

[loggers."services.auth"]
level = "debug"
handlers = ["console", "audit"]
"#,
            log_dir.display()
        )
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::Info);
        assert!(config.log_dir.ends_with("logs"));
        assert!(config.handlers.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config: LoggingConfig = toml::from_str(&sample_toml(temp_dir.path())).unwrap();

        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.formatters["clock"].datefmt.as_deref(), Some("%H:%M"));

        let audit = &config.handlers["audit"];
        assert_eq!(audit.level, Level::Debug);
        assert_eq!(audit.filters, vec!["only_debug"]);
        assert_eq!(audit.params["filename"], ParamValue::from("audit.log"));
        assert_eq!(audit.params["max_bytes"], ParamValue::Int(4096));
        assert!(!audit.params.contains_key("sink"));

        let auth = &config.loggers["services.auth"];
        assert_eq!(auth.level, Level::Debug);
        assert!(!auth.propagate);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "log_dir": "/tmp/x",
            "level": "WARN",
            "handlers": {
                "stderr": {"sink": "console", "formatter": "simple", "stream": "stderr"}
            }
        }"#;
        let config: LoggingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.level, Level::Warning);
        assert_eq!(config.handlers["stderr"].level, Level::NotSet);
        assert_eq!(
            config.handlers["stderr"].params["stream"],
            ParamValue::from("stderr")
        );
    }

    #[test]
    fn test_invalid_level_rejected() {
        let result = toml::from_str::<LoggingConfig>("level = \"chatty\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config: LoggingConfig = toml::from_str(&sample_toml(temp_dir.path())).unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LoggingConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logging.toml");
        fs::write(&path, sample_toml(temp_dir.path())).unwrap();

        let config = LoggingConfig::load(&path).unwrap();
        assert_eq!(config.log_dir, temp_dir.path());
    }

    #[test]
    fn test_load_missing_file() {
        let err = LoggingConfig::load(Path::new("/nonexistent/logging.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read logging config"));
    }

    #[test]
    fn test_from_config_routes_records() {
        let temp_dir = TempDir::new().unwrap();
        let config: LoggingConfig = toml::from_str(&sample_toml(temp_dir.path())).unwrap();
        let registry = LogRegistry::from_config(&config).unwrap();

        assert!(registry.formatter("brief").is_some());
        assert!(registry.filter("only_debug").is_some());
        assert!(registry.handler("audit").is_some());

        let auth = registry.logger("services.auth");
        assert!(!auth.propagate());
        assert_eq!(
            auth.handler_names()
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>(),
            vec!["console_handler", "audit_handler"]
        );

        auth.debug("token refreshed");
        auth.info("login ok");
        registry.flush();

        let audit = fs::read_to_string(temp_dir.path().join("audit.log")).unwrap();
        assert_eq!(audit, "DEBUG services.auth: token refreshed\n");
    }

    #[test]
    fn test_root_key_configures_root() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = LoggingConfig {
            log_dir: temp_dir.path().to_path_buf(),
            ..LoggingConfig::default()
        };
        config.loggers.insert(
            ROOT_KEY.to_string(),
            LoggerConfig {
                level: Level::Error,
                handlers: Some(vec!["error_file".to_string()]),
                propagate: false,
            },
        );

        let registry = LogRegistry::from_config(&config).unwrap();
        let root = registry.root();
        assert_eq!(root.level(), Level::Error);
        assert_eq!(root.handler_names(), vec![HandlerName::new("error_file")]);
    }

    #[test]
    fn test_unknown_formatter_in_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = LoggingConfig {
            log_dir: temp_dir.path().to_path_buf(),
            ..LoggingConfig::default()
        };
        config.handlers.insert(
            "broken".to_string(),
            HandlerConfig {
                sink: "rotating_file".to_string(),
                level: Level::Info,
                formatter: "nope".to_string(),
                filters: Vec::new(),
                params: SinkParams::from([("filename".to_string(), ParamValue::from("broken.log"))]),
            },
        );

        let err = LogRegistry::from_config(&config).unwrap_err();
        assert!(matches!(err, LogError::UnknownReference { .. }));
        assert!(!temp_dir.path().join("broken.log").exists());
    }
}
