//! Activity and workflow interceptor pipeline.
//!
//! Interceptors run in the order they are listed in configuration: the first
//! listed interceptor is the outermost, so it sees the input first and the
//! result last.

use crate::sdk::TaskFailure;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Activity invocation as seen by inbound interceptors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityInput {
    pub activity_id: String,
    pub activity_type: String,
    pub task_queue: String,
    pub workflow_namespace: String,
    pub workflow_type: Option<String>,
    pub workflow_id: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub arguments: Vec<JsonValue>,
}

pub type ActivityResult = Result<JsonValue, TaskFailure>;

/// Workflow execution details passed to failure hooks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowInfo {
    pub workflow_id: String,
    pub workflow_type: String,
    pub namespace: String,
    pub task_queue: String,
    pub arguments: Vec<JsonValue>,
}

/// How a workflow ended when a failure hook fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Panicked,
    CompletedWithFailure,
}

/// Remaining part of an activity pipeline
pub struct ActivityNext<'a> {
    rest: &'a [Arc<dyn Interceptor>],
    terminal: &'a (dyn Fn(&ActivityInput) -> ActivityResult + Send + Sync),
}

impl ActivityNext<'_> {
    /// Continue with the next interceptor, or the activity itself
    pub fn run(self, input: &ActivityInput) -> ActivityResult {
        match self.rest.split_first() {
            Some((head, tail)) => head.handle_activity_inbound(
                input,
                ActivityNext {
                    rest: tail,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(input),
        }
    }
}

/// Interceptor hooks; the defaults pass through untouched
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn handle_activity_inbound(&self, input: &ActivityInput, next: ActivityNext<'_>) -> ActivityResult {
        next.run(input)
    }

    fn on_workflow_failure(&self, _info: &WorkflowInfo, _outcome: WorkflowOutcome, _failure: &TaskFailure) {}
}

/// Ordered interceptors attached to a client or worker
#[derive(Clone, Default)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names, outermost first
    pub fn names(&self) -> Vec<String> {
        self.interceptors
            .iter()
            .map(|interceptor| interceptor.name().to_string())
            .collect()
    }

    /// Run `activity` through every inbound interceptor
    pub fn execute_activity<F>(&self, input: &ActivityInput, activity: F) -> ActivityResult
    where
        F: Fn(&ActivityInput) -> ActivityResult + Send + Sync,
    {
        ActivityNext {
            rest: &self.interceptors,
            terminal: &activity,
        }
        .run(input)
    }

    /// Notify every interceptor of a failed workflow, in order
    pub fn notify_workflow_failure(&self, info: &WorkflowInfo, outcome: WorkflowOutcome, failure: &TaskFailure) {
        for interceptor in &self.interceptors {
            interceptor.on_workflow_failure(info, outcome, failure);
        }
    }
}

impl fmt::Debug for InterceptorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorPipeline")
            .field("interceptors", &self.names())
            .finish()
    }
}
