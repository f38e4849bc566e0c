//! Connection-health decorator for exception interceptors.

use super::ExceptionInterceptor;
use crate::constants::layers;
use crate::finalizer::Finalizer;
use crate::sdk::TaskFailure;
use std::sync::Arc;
use tracing::{debug, error};

/// Runs a ping finalizer when a failure points at a broken connection, then
/// delegates the retry decision unchanged
pub struct ConnectionHealthExceptionInterceptor {
    inner: Arc<dyn ExceptionInterceptor>,
    finalizer: Arc<dyn Finalizer>,
}

impl ConnectionHealthExceptionInterceptor {
    pub fn new(inner: Arc<dyn ExceptionInterceptor>, finalizer: Arc<dyn Finalizer>) -> Self {
        Self { inner, finalizer }
    }

    pub fn finalizer_name(&self) -> &str {
        self.finalizer.name()
    }
}

impl ExceptionInterceptor for ConnectionHealthExceptionInterceptor {
    fn is_retryable(&self, failure: &TaskFailure) -> bool {
        if failure.kind.is_connection_failure() {
            debug!(
                finalizer = %self.finalizer.name(),
                "Connection closed during task, running connection health finalizer"
            );
            if let Err(e) = self.finalizer.finalize() {
                error!(
                    finalizer = %self.finalizer.name(),
                    error = %e,
                    "Connection health finalizer failed"
                );
            }
        }
        self.inner.is_retryable(failure)
    }

    fn layer_name(&self) -> &str {
        layers::CONNECTION_HEALTH
    }

    fn inner(&self) -> Option<&dyn ExceptionInterceptor> {
        Some(self.inner.as_ref())
    }
}
