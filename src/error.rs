//! Error types for registry operations

use std::fmt;

/// Which registry table a failed lookup went to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Formatter,
    Filter,
    FilterFactory,
    Handler,
    SinkFactory,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefKind::Formatter => "formatter",
            RefKind::Filter => "filter",
            RefKind::FilterFactory => "filter factory",
            RefKind::Handler => "handler",
            RefKind::SinkFactory => "sink factory",
        };
        f.write_str(name)
    }
}

/// Errors returned by the logging registry
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A level name that is not one of the known names or aliases
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),

    /// A handler or filter specification refers to something never registered
    #[error("unknown {kind} reference: {name:?}")]
    UnknownReference { kind: RefKind, name: String },

    /// A process-wide operation was called before `init_logging`
    #[error("logging has not been initialized")]
    NotInitialized,

    /// A formatter template could not be parsed
    #[error("invalid formatter template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A sink factory rejected one of its construction parameters
    #[error("invalid parameter {param:?} for {sink} sink: {reason}")]
    InvalidParameter {
        sink: String,
        param: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LogError {
    pub(crate) fn unknown(kind: RefKind, name: impl Into<String>) -> Self {
        LogError::UnknownReference {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn invalid_param(
        sink: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        LogError::InvalidParameter {
            sink: sink.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LogError>;
