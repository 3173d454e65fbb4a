//! `tracing` integration
//!
//! [`RoutingLayer`] turns every `tracing` event into a [`Record`] and hands it
//! to the registry, so `tracing::warn!(target: "services::db", ...)` and
//! `get_logger("services.db", ..).warning(..)` end up in the same places.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::level::Level;
use crate::logger::normalize_name;
use crate::record::Record;
use crate::registry::LogRegistry;

/// Layer that routes `tracing` events through a [`LogRegistry`]
#[derive(Debug, Clone)]
pub struct RoutingLayer {
    registry: LogRegistry,
}

impl RoutingLayer {
    pub fn new(registry: LogRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &LogRegistry {
        &self.registry
    }
}

impl<S: Subscriber> Layer<S> for RoutingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(*metadata.level());
        let logger = normalize_name(metadata.target());

        // Levels can change at runtime, so this is checked per event rather
        // than cached per callsite.
        if !self.registry.is_enabled_for(&logger, level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut record = Record::new(level, logger, visitor.finish());
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            record = record.with_location(file, line);
        }
        if let Some(module) = metadata.module_path() {
            record = record.with_function(module);
        }
        self.registry.dispatch(&record);
    }
}

/// Collects the `message` field and renders the rest as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    fn registry(temp_dir: &TempDir) -> (LogRegistry, Arc<MemorySink>) {
        let console = Arc::new(MemorySink::default());
        let registry = LogRegistry::builder(temp_dir.path())
            .level(Level::Debug)
            .console(console.clone())
            .build()
            .unwrap();
        (registry, console)
    }

    #[test]
    fn test_events_route_by_target() {
        let temp_dir = TempDir::new().unwrap();
        let (registry, console) = registry(&temp_dir);
        let child = registry.get_logger("services.db", Level::Info, Some(&["console"])).unwrap();
        assert_eq!(child.name(), "services.db");

        let subscriber = tracing_subscriber::registry().with(registry.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "services::db", "below the child's level");
            tracing::warn!(target: "services::db", rows = 3, "slow query");
            tracing::error!(target: "web", "request failed");
        });
        registry.flush();

        assert_eq!(console.messages(), vec!["slow query rows=3", "request failed"]);

        let errors = std::fs::read_to_string(temp_dir.path().join("errors.log")).unwrap();
        assert!(errors.contains("request failed"));
        assert!(!errors.contains("slow query"));
    }

    #[test]
    fn test_event_location_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let (registry, console) = registry(&temp_dir);

        let subscriber = tracing_subscriber::registry().with(registry.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "app", "located");
        });

        let lines = console.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[layer.rs:"), "{}", lines[0]);
        assert!(lines[0].contains("INFO     located"), "{}", lines[0]);
    }

    #[test]
    fn test_visitor_without_message() {
        let mut visitor = MessageVisitor::default();
        visitor.push_field("a", format_args!("{}", 1));
        visitor.push_field("b", format_args!("{}", "two"));
        assert_eq!(visitor.finish(), "a=1 b=two");
    }
}
