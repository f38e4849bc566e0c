//! # Interceptors
//!
//! Exception interceptors decide whether a failed task is retried. Every worker
//! gets one chain built from a named base interceptor and zero or more
//! decorators:
//!
//! ```text
//! reporting (outermost, only with a reporting hub)
//!   └── connection_health (one per ping finalizer the worker declares)
//!         └── base (resolved from `exceptionInterceptor`)
//! ```
//!
//! Decorators delegate exactly once and return the delegate's answer
//! unchanged. Their own side effects are best-effort.
//!
//! The [`pipeline`] module holds the activity/workflow interceptor pipeline
//! attached to clients and workers.

pub mod activity;
pub mod connection_health;
pub mod pipeline;
pub mod reporting;

use crate::sdk::{FailureKind, TaskFailure};
use std::collections::HashSet;

pub use connection_health::ConnectionHealthExceptionInterceptor;
pub use pipeline::{Interceptor, InterceptorPipeline};
pub use reporting::ReportingExceptionInterceptor;

/// Policy deciding whether a failure may be retried
pub trait ExceptionInterceptor: Send + Sync {
    fn is_retryable(&self, failure: &TaskFailure) -> bool;

    /// Name of this layer when reported by chain inspection
    fn layer_name(&self) -> &str;

    /// Wrapped interceptor, `None` for a chain root
    fn inner(&self) -> Option<&dyn ExceptionInterceptor> {
        None
    }
}

/// Layer names from outermost to base
pub fn chain_layers(interceptor: &dyn ExceptionInterceptor) -> Vec<String> {
    let mut layers = Vec::new();
    let mut current = Some(interceptor);
    while let Some(layer) = current {
        layers.push(layer.layer_name().to_string());
        current = layer.inner();
    }
    layers
}

pub fn chain_depth(interceptor: &dyn ExceptionInterceptor) -> usize {
    chain_layers(interceptor).len()
}

/// Base interceptor: retries everything except panics, fatal errors and
/// failures marked or configured as non-retryable
#[derive(Debug, Clone, Default)]
pub struct DefaultExceptionInterceptor {
    non_retryable_types: HashSet<String>,
}

impl DefaultExceptionInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_non_retryable_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            non_retryable_types: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExceptionInterceptor for DefaultExceptionInterceptor {
    fn is_retryable(&self, failure: &TaskFailure) -> bool {
        if failure.non_retryable {
            return false;
        }
        if matches!(failure.kind, FailureKind::Panic | FailureKind::Fatal) {
            return false;
        }
        !self.non_retryable_types.contains(&failure.error_type)
    }

    fn layer_name(&self) -> &str {
        "base"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interceptor_policy() {
        let interceptor = DefaultExceptionInterceptor::with_non_retryable_types(["Validation"]);

        assert!(interceptor.is_retryable(&TaskFailure::application("Io", "reset")));
        assert!(interceptor.is_retryable(&TaskFailure::connection_closed("gone")));
        assert!(!interceptor.is_retryable(&TaskFailure::application("Validation", "bad")));
        assert!(!interceptor.is_retryable(&TaskFailure::application("Io", "x").non_retryable()));
        assert!(!interceptor.is_retryable(&TaskFailure::new(
            FailureKind::Panic,
            "Panic",
            "index out of bounds"
        )));
    }

    #[test]
    fn test_undecorated_chain_depth() {
        let interceptor = DefaultExceptionInterceptor::new();
        assert_eq!(chain_depth(&interceptor), 1);
        assert_eq!(chain_layers(&interceptor), vec!["base"]);
    }
}
