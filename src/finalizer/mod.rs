//! # Finalizers
//!
//! Cleanup actions run after every activity. A worker that lists finalizers
//! gets one [`ChainFinalizer`] running them in listed order; a failure is
//! logged and the chain moves on to the next finalizer.

pub mod connection;

use crate::constants::layers;
use crate::error::FinalizationError;
use crate::sdk::{ErrorReportingHub, ReportContext};
use std::sync::Arc;
use tracing::error;

pub use connection::{ClearConnectionsFinalizer, PingConnectionFinalizer};

/// Side-effecting cleanup action
pub trait Finalizer: Send + Sync {
    fn finalize(&self) -> Result<(), FinalizationError>;

    fn name(&self) -> &str;

    /// Whether this finalizer restores pooled connections; workers listing one
    /// get a connection-health layer on their exception interceptor
    fn checks_connection(&self) -> bool {
        false
    }

    /// Wrapped finalizer, `None` for a chain root
    fn inner(&self) -> Option<&dyn Finalizer> {
        None
    }
}

/// Layer names from outermost to base
pub fn finalizer_layers(finalizer: &dyn Finalizer) -> Vec<String> {
    let mut layers = Vec::new();
    let mut current = Some(finalizer);
    while let Some(layer) = current {
        layers.push(layer.name().to_string());
        current = layer.inner();
    }
    layers
}

/// Runs every finalizer exactly once, in order, regardless of earlier failures
pub struct ChainFinalizer {
    name: String,
    finalizers: Vec<Arc<dyn Finalizer>>,
}

impl ChainFinalizer {
    pub fn new(name: impl Into<String>, finalizers: Vec<Arc<dyn Finalizer>>) -> Self {
        Self {
            name: name.into(),
            finalizers,
        }
    }

    pub fn len(&self) -> usize {
        self.finalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finalizers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.finalizers.iter().map(|f| f.name()).collect()
    }
}

impl Finalizer for ChainFinalizer {
    fn finalize(&self) -> Result<(), FinalizationError> {
        let mut failures = Vec::new();
        for finalizer in &self.finalizers {
            if let Err(e) = finalizer.finalize() {
                error!(
                    chain = %self.name,
                    finalizer = %finalizer.name(),
                    error = %e,
                    "Finalizer failed, continuing with the rest of the chain"
                );
                failures.push(format!("{}: {e}", finalizer.name()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FinalizationError::Chain {
                failures,
                total: self.finalizers.len(),
            })
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Reports finalization failures to the hub and returns the result unchanged
pub struct ReportingFinalizer {
    inner: Arc<dyn Finalizer>,
    hub: Arc<dyn ErrorReportingHub>,
}

impl ReportingFinalizer {
    pub fn new(inner: Arc<dyn Finalizer>, hub: Arc<dyn ErrorReportingHub>) -> Self {
        Self { inner, hub }
    }
}

impl Finalizer for ReportingFinalizer {
    fn finalize(&self) -> Result<(), FinalizationError> {
        let result = self.inner.finalize();
        if let Err(e) = &result {
            let context =
                ReportContext::new("finalizer").with_field("finalizer", self.inner.name());
            if let Err(report_error) = self.hub.capture_exception(e, &context) {
                error!(
                    finalizer = %self.inner.name(),
                    error = %report_error,
                    "Failed to report finalizer failure"
                );
            }
        }
        result
    }

    fn name(&self) -> &str {
        layers::REPORTING
    }

    fn inner(&self) -> Option<&dyn Finalizer> {
        Some(self.inner.as_ref())
    }
}
