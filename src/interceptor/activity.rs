//! Built-in pipeline interceptors registered when optional collaborators exist.

use super::pipeline::{
    ActivityInput, ActivityNext, ActivityResult, Interceptor, WorkflowInfo, WorkflowOutcome,
};
use super::ExceptionInterceptor;
use crate::constants::services;
use crate::finalizer::Finalizer;
use crate::sdk::{ErrorReportingHub, ReportContext, TaskFailure};
use std::sync::Arc;
use tracing::{debug, error};

/// Captures failed activities with activity and workflow context, then re-raises
pub struct ReportingActivityInterceptor {
    hub: Arc<dyn ErrorReportingHub>,
}

impl ReportingActivityInterceptor {
    pub fn new(hub: Arc<dyn ErrorReportingHub>) -> Self {
        Self { hub }
    }
}

impl Interceptor for ReportingActivityInterceptor {
    fn name(&self) -> &str {
        services::REPORTING_ACTIVITY_INBOUND_INTERCEPTOR
    }

    fn handle_activity_inbound(&self, input: &ActivityInput, next: ActivityNext<'_>) -> ActivityResult {
        let result = next.run(input);
        if let Err(failure) = &result {
            let mut context = ReportContext::new("activity")
                .with_field("activity.id", input.activity_id.clone())
                .with_field("activity.type", input.activity_type.clone())
                .with_field("activity.task_queue", input.task_queue.clone())
                .with_field("workflow.namespace", input.workflow_namespace.clone());
            if let Some(workflow_type) = &input.workflow_type {
                context = context.with_field("workflow.type", workflow_type.clone());
            }
            if let Some(workflow_id) = &input.workflow_id {
                context = context.with_field("workflow.id", workflow_id.clone());
            }
            if let Err(e) = self.hub.capture_exception(failure, &context) {
                error!(
                    activity_type = %input.activity_type,
                    error = %e,
                    "Failed to report activity failure"
                );
            }
        }
        result
    }
}

/// Captures workflow panics and failed completions, then passes through
pub struct ReportingWorkflowInterceptor {
    hub: Arc<dyn ErrorReportingHub>,
}

impl ReportingWorkflowInterceptor {
    pub fn new(hub: Arc<dyn ErrorReportingHub>) -> Self {
        Self { hub }
    }
}

impl Interceptor for ReportingWorkflowInterceptor {
    fn name(&self) -> &str {
        services::REPORTING_WORKFLOW_OUTBOUND_INTERCEPTOR
    }

    fn on_workflow_failure(&self, info: &WorkflowInfo, outcome: WorkflowOutcome, failure: &TaskFailure) {
        let outcome = match outcome {
            WorkflowOutcome::Panicked => "panicked",
            WorkflowOutcome::CompletedWithFailure => "completed_with_failure",
        };
        let context = ReportContext::new("workflow")
            .with_field("workflow.id", info.workflow_id.clone())
            .with_field("workflow.type", info.workflow_type.clone())
            .with_field("workflow.namespace", info.namespace.clone())
            .with_field("workflow.task_queue", info.task_queue.clone())
            .with_field("workflow.outcome", outcome)
            .with_field(
                "workflow.arguments",
                serde_json::Value::Array(info.arguments.clone()).to_string(),
            );
        if let Err(e) = self.hub.capture_exception(failure, &context) {
            error!(
                workflow_type = %info.workflow_type,
                error = %e,
                "Failed to report workflow failure"
            );
        }
    }
}

/// Hands workflow panics caused by a broken connection to a connection-health
/// exception interceptor chain, then passes through
pub struct ConnectionHealthWorkflowInterceptor {
    interceptor: Arc<dyn ExceptionInterceptor>,
}

impl ConnectionHealthWorkflowInterceptor {
    pub fn new(interceptor: Arc<dyn ExceptionInterceptor>) -> Self {
        Self { interceptor }
    }
}

impl Interceptor for ConnectionHealthWorkflowInterceptor {
    fn name(&self) -> &str {
        services::CONNECTION_HEALTH_WORKFLOW_OUTBOUND_INTERCEPTOR
    }

    fn on_workflow_failure(&self, info: &WorkflowInfo, outcome: WorkflowOutcome, failure: &TaskFailure) {
        if outcome != WorkflowOutcome::Panicked || !failure.kind.is_connection_failure() {
            return;
        }
        // Only the pings matter here; the panic is not retried
        let retryable = self.interceptor.is_retryable(failure);
        debug!(
            workflow_type = %info.workflow_type,
            retryable,
            "Checked connections after workflow panic"
        );
    }
}

/// Runs the connection ping finalizers when an activity fails on a broken
/// connection, then re-raises the original failure
pub struct ConnectionHealthActivityInterceptor {
    finalizers: Vec<Arc<dyn Finalizer>>,
}

impl ConnectionHealthActivityInterceptor {
    pub fn new(finalizers: Vec<Arc<dyn Finalizer>>) -> Self {
        Self { finalizers }
    }
}

impl Interceptor for ConnectionHealthActivityInterceptor {
    fn name(&self) -> &str {
        services::CONNECTION_HEALTH_ACTIVITY_INBOUND_INTERCEPTOR
    }

    fn handle_activity_inbound(&self, input: &ActivityInput, next: ActivityNext<'_>) -> ActivityResult {
        let result = next.run(input);
        if let Err(failure) = &result {
            if failure.kind.is_connection_failure() {
                for finalizer in &self.finalizers {
                    if let Err(e) = finalizer.finalize() {
                        error!(
                            finalizer = %finalizer.name(),
                            activity_type = %input.activity_type,
                            error = %e,
                            "Connection health finalizer failed"
                        );
                    }
                }
            }
        }
        result
    }
}
