//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A request names an asset or job id that has no usable record.
    #[error("{kind} with id '{id}' not found")]
    Reference { kind: String, id: String },

    /// The pipeline compiler rejected a parameter before launch.
    #[error("invalid parameter '{parameter}': {reason}")]
    Compilation { parameter: String, reason: String },

    /// The external engine exited unsuccessfully.
    #[error("engine exited with code {exit_code}")]
    EngineExecution { exit_code: i32 },

    /// The metadata probe could not describe a file.
    #[error("probe error: {0}")]
    Probe(String),

    /// A callback target could not be reached.
    #[error("notification delivery failed: {0}")]
    NotificationDelivery(String),

    #[error("Invalid state transition: cannot transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {op} {path}: {source}")]
    IoPath {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn reference(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Reference {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn compilation(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compilation {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io_path(op: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether this error means "no such record".
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }
}

impl From<filter_graph::GraphError> for Error {
    fn from(err: filter_graph::GraphError) -> Self {
        Self::Other(format!("filter graph construction failed: {err}"))
    }
}
