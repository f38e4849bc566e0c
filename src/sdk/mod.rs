//! # Execution Engine Seams
//!
//! Traits for the collaborators the assembler drives but does not implement:
//! the execution engine (worker factory and workers), the optional
//! error-reporting hub and the optional connection-pool registry.
//!
//! Implementations must be safe to call from whatever tasks the engine uses to
//! drive workers, so every trait here is `Send + Sync`.

pub mod inspection;

use crate::error::{EngineError, PoolError, ReportingError};
use crate::interceptor::pipeline::InterceptorPipeline;
use crate::interceptor::ExceptionInterceptor;
use crate::worker::discovery::{ActivityRegistration, WorkflowRegistration};
use crate::worker::options::WorkerOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Classification of a task failure as seen by interceptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Error raised by workflow or activity code
    Application,
    /// A pooled connection was found closed
    ConnectionClosed,
    /// The database driver reported an error
    Driver,
    Timeout,
    Panic,
    Fatal,
}

impl FailureKind {
    /// Failures pointing at a broken pooled connection
    pub fn is_connection_failure(self) -> bool {
        matches!(self, FailureKind::ConnectionClosed | FailureKind::Driver)
    }
}

/// A failed workflow or activity task
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{error_type}: {message}")]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub non_retryable: bool,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            error_type: error_type.into(),
            message: message.into(),
            non_retryable: false,
        }
    }

    pub fn application(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Application, error_type, message)
    }

    pub fn connection_closed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ConnectionClosed, "ConnectionClosed", message)
    }

    pub fn non_retryable(mut self) -> Self {
        self.non_retryable = true;
        self
    }
}

/// Context attached to a captured failure
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportContext {
    /// Where the failure was observed, e.g. `activity` or `finalizer`
    pub scope: String,
    pub fields: BTreeMap<String, String>,
}

impl ReportContext {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Optional error-reporting sink
pub trait ErrorReportingHub: Send + Sync {
    fn capture_exception(
        &self,
        error: &(dyn std::error::Error + Send + Sync),
        context: &ReportContext,
    ) -> Result<(), ReportingError>;
}

/// One named pool of database connections
pub trait ConnectionPool: Send + Sync {
    /// Run a cheap liveness query
    fn ping(&self) -> Result<(), PoolError>;

    /// Close and reopen the underlying connection
    fn reconnect(&self) -> Result<(), PoolError>;

    /// Whether the unit of work bound to the pool is still usable
    fn is_open(&self) -> bool {
        true
    }

    /// Replace a closed unit of work with a fresh one
    fn reset(&self) -> Result<(), PoolError>;

    /// Drop state tracked by the unit of work
    fn clear(&self) -> Result<(), PoolError> {
        Ok(())
    }
}

/// Optional registry enumerating the named connection pools
pub trait ConnectionPoolRegistry: Send + Sync {
    fn pool_names(&self) -> Vec<String>;

    fn pool(&self, name: &str) -> Option<Arc<dyn ConnectionPool>>;
}

/// Callback run by a worker after every activity
pub type ActivityFinalizer = Arc<dyn Fn() + Send + Sync>;

/// Factory side of the execution engine
#[async_trait]
pub trait WorkerFactory: Send + Sync {
    fn new_worker(
        &self,
        task_queue: &str,
        options: WorkerOptions,
        exception_interceptor: Arc<dyn ExceptionInterceptor>,
        pipeline: InterceptorPipeline,
    ) -> Result<Box<dyn Worker>, EngineError>;

    /// Unregister a worker created by [`new_worker`](Self::new_worker) when
    /// assembly is abandoned; workers are discarded newest first
    fn discard_worker(&self, worker: Box<dyn Worker>) -> Result<(), EngineError>;

    /// Hand control to the engine's poll loop; returns on shutdown or fatal error
    async fn run(&self) -> Result<(), EngineError>;
}

/// A worker created by the engine, configured during assembly
pub trait Worker: Send + Sync + fmt::Debug {
    fn task_queue(&self) -> &str;

    fn options(&self) -> &WorkerOptions;

    fn register_workflow_type(&mut self, workflow: &WorkflowRegistration)
        -> Result<(), EngineError>;

    fn register_activity(&mut self, activity: &ActivityRegistration) -> Result<(), EngineError>;

    fn register_activity_finalizer(&mut self, finalizer: ActivityFinalizer)
        -> Result<(), EngineError>;

    /// Workflow type names registered on this worker
    fn workflow_types(&self) -> Vec<String>;

    /// Activity type names (prefix applied) registered on this worker
    fn activity_types(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failure_kinds() {
        assert!(FailureKind::ConnectionClosed.is_connection_failure());
        assert!(FailureKind::Driver.is_connection_failure());
        assert!(!FailureKind::Application.is_connection_failure());
        assert!(!FailureKind::Panic.is_connection_failure());
    }

    #[test]
    fn test_task_failure_display() {
        let failure = TaskFailure::application("InvalidArgument", "bad input").non_retryable();
        assert_eq!(failure.to_string(), "InvalidArgument: bad input");
        assert!(failure.non_retryable);

        let context = ReportContext::new("activity").with_field("task_queue", "foo");
        assert_eq!(context.fields["task_queue"], "foo");
    }
}
