//! Recording execution engine.
//!
//! [`InspectionWorkerFactory`] creates workers that only record what assembly
//! attached to them. The debug binary assembles against it so configuration
//! can be checked without an engine, and tests use it to observe assembly.

use super::{ActivityFinalizer, Worker, WorkerFactory};
use crate::error::EngineError;
use crate::interceptor::pipeline::InterceptorPipeline;
use crate::interceptor::ExceptionInterceptor;
use crate::worker::discovery::{ActivityRegistration, WorkflowRegistration};
use crate::worker::options::WorkerOptions;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct Registrations {
    workflows: Vec<String>,
    activities: Vec<String>,
    finalizers: Vec<ActivityFinalizer>,
}

/// Everything the engine received for one worker
pub struct WorkerRecord {
    task_queue: String,
    options: WorkerOptions,
    exception_interceptor: Arc<dyn ExceptionInterceptor>,
    pipeline: InterceptorPipeline,
    registrations: Mutex<Registrations>,
}

impl WorkerRecord {
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub fn exception_interceptor(&self) -> &Arc<dyn ExceptionInterceptor> {
        &self.exception_interceptor
    }

    pub fn pipeline(&self) -> &InterceptorPipeline {
        &self.pipeline
    }

    pub fn workflow_types(&self) -> Vec<String> {
        self.registrations.lock().workflows.clone()
    }

    pub fn activity_types(&self) -> Vec<String> {
        self.registrations.lock().activities.clone()
    }

    pub fn finalizer_count(&self) -> usize {
        self.registrations.lock().finalizers.len()
    }

    /// Run the registered activity finalizers as the engine would after an activity
    pub fn run_activity_finalizers(&self) {
        let finalizers = self.registrations.lock().finalizers.clone();
        for finalizer in finalizers {
            finalizer();
        }
    }
}

impl fmt::Debug for WorkerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registrations = self.registrations.lock();
        f.debug_struct("WorkerRecord")
            .field("task_queue", &self.task_queue)
            .field("options", &self.options)
            .field("exception_interceptor", &self.exception_interceptor.layer_name())
            .field("pipeline", &self.pipeline)
            .field("workflows", &registrations.workflows)
            .field("activities", &registrations.activities)
            .field("finalizers", &registrations.finalizers.len())
            .finish()
    }
}

/// Worker handle returned by [`InspectionWorkerFactory`]
#[derive(Debug)]
pub struct InspectionWorker {
    record: Arc<WorkerRecord>,
}

impl Worker for InspectionWorker {
    fn task_queue(&self) -> &str {
        &self.record.task_queue
    }

    fn options(&self) -> &WorkerOptions {
        &self.record.options
    }

    fn register_workflow_type(&mut self, workflow: &WorkflowRegistration) -> Result<(), EngineError> {
        self.record
            .registrations
            .lock()
            .workflows
            .push(workflow.workflow_type.clone());
        Ok(())
    }

    fn register_activity(&mut self, activity: &ActivityRegistration) -> Result<(), EngineError> {
        self.record
            .registrations
            .lock()
            .activities
            .push(activity.registered_name());
        Ok(())
    }

    fn register_activity_finalizer(&mut self, finalizer: ActivityFinalizer) -> Result<(), EngineError> {
        self.record.registrations.lock().finalizers.push(finalizer);
        Ok(())
    }

    fn workflow_types(&self) -> Vec<String> {
        self.record.workflow_types()
    }

    fn activity_types(&self) -> Vec<String> {
        self.record.activity_types()
    }
}

/// Engine stand-in that records created workers and `run` calls
#[derive(Default)]
pub struct InspectionWorkerFactory {
    created: Mutex<Vec<Arc<WorkerRecord>>>,
    failing_task_queues: HashSet<String>,
    run_failure: Option<String>,
    run_calls: AtomicUsize,
    discarded: AtomicUsize,
}

impl InspectionWorkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create a worker for `task_queue`
    pub fn failing_on(mut self, task_queue: impl Into<String>) -> Self {
        self.failing_task_queues.insert(task_queue.into());
        self
    }

    /// Make `run` stop with an engine error
    pub fn with_run_failure(mut self, message: impl Into<String>) -> Self {
        self.run_failure = Some(message.into());
        self
    }

    /// Workers created so far, in creation order
    pub fn created(&self) -> Vec<Arc<WorkerRecord>> {
        self.created.lock().clone()
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    /// Workers removed again because assembly was abandoned
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for InspectionWorkerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectionWorkerFactory")
            .field("created", &self.created.lock().len())
            .field("run_calls", &self.run_calls())
            .field("discarded", &self.discarded())
            .finish()
    }
}

#[async_trait]
impl WorkerFactory for InspectionWorkerFactory {
    fn new_worker(
        &self,
        task_queue: &str,
        options: WorkerOptions,
        exception_interceptor: Arc<dyn ExceptionInterceptor>,
        pipeline: InterceptorPipeline,
    ) -> Result<Box<dyn Worker>, EngineError> {
        if self.failing_task_queues.contains(task_queue) {
            return Err(EngineError::WorkerCreation {
                task_queue: task_queue.to_string(),
                message: "worker creation refused".to_string(),
            });
        }

        let record = Arc::new(WorkerRecord {
            task_queue: task_queue.to_string(),
            options,
            exception_interceptor,
            pipeline,
            registrations: Mutex::new(Registrations::default()),
        });
        self.created.lock().push(record.clone());
        debug!(task_queue = %task_queue, "Recorded worker creation");

        Ok(Box::new(InspectionWorker { record }))
    }

    fn discard_worker(&self, worker: Box<dyn Worker>) -> Result<(), EngineError> {
        let mut created = self.created.lock();
        let position = created
            .iter()
            .rposition(|record| record.task_queue == worker.task_queue())
            .ok_or_else(|| EngineError::WorkerDiscard {
                task_queue: worker.task_queue().to_string(),
                message: "worker was never created".to_string(),
            })?;
        created.remove(position);
        self.discarded.fetch_add(1, Ordering::SeqCst);
        debug!(task_queue = %worker.task_queue(), "Discarded worker");
        Ok(())
    }

    async fn run(&self) -> Result<(), EngineError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        info!(workers = self.created.lock().len(), "Inspection engine run requested");
        match &self.run_failure {
            Some(message) => Err(EngineError::Run {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
