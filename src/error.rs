//! # Assembly Error Types
//!
//! Structured error types for configuration loading, name resolution and the
//! runtime boundaries (data conversion, finalization, reporting, connection
//! pools, execution engine).
//!
//! Assembly-time errors ([`AssemblyError`]) are always fatal: they abort the
//! whole assembly before any worker is handed to the execution engine. The
//! runtime boundary errors are recovered where they occur.

use std::fmt;
use thiserror::Error;

/// Kind of object a symbolic name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Client,
    ScheduleClient,
    Worker,
    WorkerFactory,
    DataConverter,
    ExceptionInterceptor,
    Interceptor,
    Finalizer,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::Client => "client",
            ReferenceKind::ScheduleClient => "schedule client",
            ReferenceKind::Worker => "worker",
            ReferenceKind::WorkerFactory => "worker factory",
            ReferenceKind::DataConverter => "data converter",
            ReferenceKind::ExceptionInterceptor => "exception interceptor",
            ReferenceKind::Interceptor => "interceptor",
            ReferenceKind::Finalizer => "finalizer",
        };
        f.write_str(label)
    }
}

/// Stable classification of an [`AssemblyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    UnresolvedReference,
    DuplicateName,
    Engine,
}

/// Errors raised while loading configuration or assembling clients and workers
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Configuration error at {path}: {message}")]
    Configuration { path: String, message: String },

    #[error("Repeated entry at {path}: \"{entry}\" should not be repeated")]
    RepeatedEntry { path: String, entry: String },

    #[error("Failed to parse date-interval at {path}, value: \"{value}\"")]
    InvalidInterval { path: String, value: String },

    #[error("Unresolved {kind} reference: \"{name}\"")]
    UnresolvedReference { kind: ReferenceKind, name: String },

    #[error("Duplicate {kind} name: \"{name}\"")]
    DuplicateName { kind: ReferenceKind, name: String },

    #[error("Execution engine error: {0}")]
    Engine(#[from] EngineError),
}

impl AssemblyError {
    /// Create a configuration error
    pub fn configuration(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a repeated list entry error
    pub fn repeated_entry(path: impl Into<String>, entry: impl Into<String>) -> Self {
        Self::RepeatedEntry {
            path: path.into(),
            entry: entry.into(),
        }
    }

    /// Create an interval parse error
    pub fn invalid_interval(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidInterval {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            name: name.into(),
        }
    }

    /// Create a duplicate name error
    pub fn duplicate(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AssemblyError::Configuration { .. }
            | AssemblyError::RepeatedEntry { .. }
            | AssemblyError::InvalidInterval { .. } => ErrorKind::Configuration,
            AssemblyError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            AssemblyError::DuplicateName { .. } => ErrorKind::DuplicateName,
            AssemblyError::Engine(_) => ErrorKind::Engine,
        }
    }

    /// Every assembly error aborts process start
    pub fn is_fatal(&self) -> bool {
        true
    }
}

pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Payload (de)serialization failure at the data converter boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataConversionError {
    #[error("Failed to encode payload: {message}")]
    Encode { message: String },

    #[error("Failed to decode payload: {message}")]
    Decode { message: String },

    #[error("Payload type mismatch: expected {expected}, payload carries {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unsupported payload encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },
}

impl DataConversionError {
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// A finalizer failed; logged by chains, never propagated to the triggering caller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FinalizationError {
    #[error("Finalizer {finalizer} failed: {message}")]
    Failed { finalizer: String, message: String },

    #[error("{} of {total} finalizers failed: {}", failures.len(), failures.join("; "))]
    Chain { failures: Vec<String>, total: usize },
}

impl FinalizationError {
    pub fn failed(finalizer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            finalizer: finalizer.into(),
            message: message.into(),
        }
    }
}

/// The error-reporting side effect itself failed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to report failure: {message}")]
pub struct ReportingError {
    pub message: String,
}

impl ReportingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Connection pool collaborator failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Connection pool {pool} error: {message}")]
pub struct PoolError {
    pub pool: String,
    pub message: String,
}

impl PoolError {
    pub fn new(pool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by the execution engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Failed to create worker for task queue {task_queue}: {message}")]
    WorkerCreation { task_queue: String, message: String },

    #[error("Failed to discard worker for task queue {task_queue}: {message}")]
    WorkerDiscard { task_queue: String, message: String },

    #[error("Execution engine stopped with error: {message}")]
    Run { message: String },
}
