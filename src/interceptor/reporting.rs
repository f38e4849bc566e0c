//! Error-reporting decorator for exception interceptors.

use super::ExceptionInterceptor;
use crate::constants::layers;
use crate::sdk::{ErrorReportingHub, ReportContext, TaskFailure};
use std::sync::Arc;
use tracing::error;

/// Captures every failure to the reporting hub, then delegates unchanged
pub struct ReportingExceptionInterceptor {
    inner: Arc<dyn ExceptionInterceptor>,
    hub: Arc<dyn ErrorReportingHub>,
}

impl ReportingExceptionInterceptor {
    pub fn new(inner: Arc<dyn ExceptionInterceptor>, hub: Arc<dyn ErrorReportingHub>) -> Self {
        Self { inner, hub }
    }
}

impl ExceptionInterceptor for ReportingExceptionInterceptor {
    fn is_retryable(&self, failure: &TaskFailure) -> bool {
        let context = ReportContext::new("exception_interceptor")
            .with_field("error_type", failure.error_type.clone());
        if let Err(e) = self.hub.capture_exception(failure, &context) {
            error!(error = %e, failure = %failure, "Failed to report task failure");
        }
        self.inner.is_retryable(failure)
    }

    fn layer_name(&self) -> &str {
        layers::REPORTING
    }

    fn inner(&self) -> Option<&dyn ExceptionInterceptor> {
        Some(self.inner.as_ref())
    }
}
