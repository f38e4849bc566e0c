//! # Worker Assembly
//!
//! Builds one engine worker per configured entry. Assembly runs in two phases
//! so a bad reference anywhere fails before the engine creates any worker:
//!
//! 1. **Plan**: check that each declared worker affinity names a configured
//!    worker, then for every entry resolve the named collaborators, apply
//!    tunables and compose the exception interceptor and finalizer chains.
//! 2. **Build**: create each worker on the engine, assign workflows and
//!    activities by affinity and register the chain finalizer.
//!
//! If the engine refuses a worker or a registration, the workers created so
//! far are discarded again. The discovery registry is drained only after
//! every worker was built.

pub mod discovery;
pub mod options;

use crate::config::WorkerConfig;
use crate::constants::{ids, layers};
use crate::decorator::DecoratorChain;
use crate::error::{AssemblyError, AssemblyResult, ReferenceKind};
use crate::finalizer::{ChainFinalizer, Finalizer, ReportingFinalizer};
use crate::interceptor::pipeline::{Interceptor, InterceptorPipeline};
use crate::interceptor::{
    ConnectionHealthExceptionInterceptor, ExceptionInterceptor, ReportingExceptionInterceptor,
};
use crate::logging::{log_assembly_operation, log_error};
use crate::registry::NameRegistry;
use crate::sdk::{ErrorReportingHub, Worker, WorkerFactory};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub use discovery::{
    ActivityRegistration, Affinity, DiscoveryRegistry, RegistrationReport, WorkflowRegistration,
};
pub use options::WorkerOptions;

/// A worker created by the engine plus what assembly attached to it
pub struct AssembledWorker {
    name: String,
    task_queue: String,
    exception_interceptor: Arc<dyn ExceptionInterceptor>,
    exception_layers: Vec<String>,
    finalizer: Option<Arc<dyn Finalizer>>,
    interceptors: Vec<String>,
    workflows: Vec<String>,
    activities: Vec<String>,
    worker: Box<dyn Worker>,
}

impl AssembledWorker {
    pub fn id(&self) -> String {
        ids::worker(&self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Outermost layer of the exception interceptor chain
    pub fn exception_interceptor(&self) -> &Arc<dyn ExceptionInterceptor> {
        &self.exception_interceptor
    }

    /// Chain layers, outermost first
    pub fn exception_layers(&self) -> &[String] {
        &self.exception_layers
    }

    /// Chain finalizer registered on the worker, if any finalizers were listed
    pub fn finalizer(&self) -> Option<&Arc<dyn Finalizer>> {
        self.finalizer.as_ref()
    }

    /// Interceptor pipeline names, outermost first
    pub fn interceptors(&self) -> &[String] {
        &self.interceptors
    }

    /// Workflow types assigned by affinity, in discovery order
    pub fn workflows(&self) -> &[String] {
        &self.workflows
    }

    /// Activity names (prefix applied) assigned by affinity, in discovery order
    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    pub fn options(&self) -> &WorkerOptions {
        self.worker.options()
    }

    pub fn worker(&self) -> &dyn Worker {
        self.worker.as_ref()
    }
}

impl fmt::Debug for AssembledWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssembledWorker")
            .field("name", &self.name)
            .field("task_queue", &self.task_queue)
            .field("exception_layers", &self.exception_layers)
            .field("finalizer", &self.finalizer.as_ref().map(|f| f.name().to_string()))
            .field("interceptors", &self.interceptors)
            .field("workflows", &self.workflows)
            .field("activities", &self.activities)
            .finish()
    }
}

/// Every assembled worker, keyed by configured name
#[derive(Debug, Default)]
pub struct WorkerSet {
    pub workers: BTreeMap<String, AssembledWorker>,
    pub report: RegistrationReport,
}

/// Everything derived from one worker entry before the engine is touched
struct WorkerPlan<'c> {
    name: &'c str,
    task_queue: &'c str,
    options: WorkerOptions,
    exception_interceptor: Arc<dyn ExceptionInterceptor>,
    exception_layers: Vec<String>,
    pipeline: InterceptorPipeline,
    finalizer: Option<Arc<dyn Finalizer>>,
}

pub struct WorkerAssembler<'a> {
    exception_interceptors: &'a NameRegistry<dyn ExceptionInterceptor>,
    interceptors: &'a NameRegistry<dyn Interceptor>,
    finalizers: &'a NameRegistry<dyn Finalizer>,
    reporting_hub: Option<Arc<dyn ErrorReportingHub>>,
}

impl<'a> WorkerAssembler<'a> {
    pub fn new(
        exception_interceptors: &'a NameRegistry<dyn ExceptionInterceptor>,
        interceptors: &'a NameRegistry<dyn Interceptor>,
        finalizers: &'a NameRegistry<dyn Finalizer>,
        reporting_hub: Option<Arc<dyn ErrorReportingHub>>,
    ) -> Self {
        Self {
            exception_interceptors,
            interceptors,
            finalizers,
            reporting_hub,
        }
    }

    /// Build every configured worker and consume the discovered registrations.
    ///
    /// On error every worker already created on the engine is discarded again,
    /// so the engine never keeps part of a failed assembly.
    pub fn assemble(
        &self,
        factory: &dyn WorkerFactory,
        workers: &BTreeMap<String, WorkerConfig>,
        discovery: &mut DiscoveryRegistry,
    ) -> AssemblyResult<WorkerSet> {
        let plans = self.plan(workers, discovery)?;

        let mut set = WorkerSet::default();
        let mut created: Vec<AssembledWorker> = Vec::with_capacity(plans.len());
        for plan in plans {
            match self.build(factory, plan, discovery) {
                Ok(assembled) => created.push(assembled),
                Err(e) => {
                    discard_all(factory, created);
                    return Err(e);
                }
            }
        }
        set.workers = created
            .into_iter()
            .map(|assembled| (assembled.name.clone(), assembled))
            .collect();
        if !set.workers.is_empty() {
            set.report = RegistrationReport::unconstrained(discovery);
        }

        let (workflows, activities) = discovery.drain();
        info!(
            workers = set.workers.len(),
            workflows = workflows.len(),
            activities = activities.len(),
            workflows_without_workers = set.report.workflows_without_workers.len(),
            activities_without_workers = set.report.activities_without_workers.len(),
            "Worker assembly complete"
        );
        Ok(set)
    }

    fn plan<'c>(
        &self,
        workers: &'c BTreeMap<String, WorkerConfig>,
        discovery: &DiscoveryRegistry,
    ) -> AssemblyResult<Vec<WorkerPlan<'c>>> {
        let declared = discovery
            .workflows()
            .iter()
            .flat_map(|w| w.affinity.workers())
            .chain(discovery.activities().iter().flat_map(|a| a.affinity.workers()));
        for worker in declared {
            if !workers.contains_key(worker) {
                return Err(AssemblyError::unresolved(ReferenceKind::Worker, worker));
            }
        }

        workers
            .iter()
            .map(|(name, config)| self.stage(name, config))
            .collect()
    }

    /// Resolve collaborators, apply tunables and compose both chains for one entry
    fn stage<'c>(&self, name: &'c str, config: &'c WorkerConfig) -> AssemblyResult<WorkerPlan<'c>> {
        let path = format!("temporal.workers.{name}");
        let base_interceptor = self
            .exception_interceptors
            .resolve(&config.exception_interceptor)?;
        let pipeline = InterceptorPipeline::new(self.interceptors.resolve_all(&config.interceptors)?);
        let finalizers = self.finalizers.resolve_all(&config.finalizers)?;

        let mut options = WorkerOptions::new();
        for (key, value) in config.option_entries()? {
            options.apply(&path, &key, &value)?;
        }

        let chain = self.exception_chain(base_interceptor, &finalizers);
        let exception_layers = chain.layers();

        Ok(WorkerPlan {
            name,
            task_queue: &config.task_queue,
            options: options.ensure_session_resource_id(),
            exception_interceptor: chain.build(),
            exception_layers,
            pipeline,
            finalizer: self.finalizer_chain(name, finalizers),
        })
    }

    /// Create the engine worker for a plan; a worker whose registrations fail is discarded
    fn build(
        &self,
        factory: &dyn WorkerFactory,
        plan: WorkerPlan<'_>,
        discovery: &DiscoveryRegistry,
    ) -> AssemblyResult<AssembledWorker> {
        let mut worker = factory.new_worker(
            plan.task_queue,
            plan.options.clone(),
            plan.exception_interceptor.clone(),
            plan.pipeline.clone(),
        )?;

        let registered = register_on_worker(worker.as_mut(), &plan, discovery);
        let (workflows, activities) = match registered {
            Ok(registered) => registered,
            Err(e) => {
                discard(factory, plan.name, worker);
                return Err(e);
            }
        };

        log_assembly_operation(
            "build_worker",
            "worker",
            Some(plan.name),
            "completed",
            Some(&format!(
                "task_queue={} workflows={} activities={} layers={}",
                plan.task_queue,
                workflows.len(),
                activities.len(),
                plan.exception_layers.join(">")
            )),
        );

        Ok(AssembledWorker {
            name: plan.name.to_string(),
            task_queue: plan.task_queue.to_string(),
            interceptors: plan.pipeline.names(),
            exception_interceptor: plan.exception_interceptor,
            exception_layers: plan.exception_layers,
            finalizer: plan.finalizer,
            workflows,
            activities,
            worker,
        })
    }

    /// base → connection_health (per listed connection finalizer) → reporting
    fn exception_chain(
        &self,
        base: Arc<dyn ExceptionInterceptor>,
        finalizers: &[Arc<dyn Finalizer>],
    ) -> DecoratorChain<dyn ExceptionInterceptor> {
        let base_label = base.layer_name().to_string();
        let mut chain = DecoratorChain::new(base, base_label);

        for finalizer in finalizers.iter().filter(|f| f.checks_connection()) {
            let finalizer = finalizer.clone();
            chain = chain.decorate(layers::CONNECTION_HEALTH, |inner| {
                Arc::new(ConnectionHealthExceptionInterceptor::new(inner, finalizer))
            });
        }

        chain.decorate_if_available(self.reporting_hub.clone(), layers::REPORTING, |inner, hub| {
            Arc::new(ReportingExceptionInterceptor::new(inner, hub))
        })
    }

    fn finalizer_chain(&self, worker: &str, finalizers: Vec<Arc<dyn Finalizer>>) -> Option<Arc<dyn Finalizer>> {
        if finalizers.is_empty() {
            return None;
        }

        let chain: Arc<dyn Finalizer> =
            Arc::new(ChainFinalizer::new(ids::worker_finalizer(worker), finalizers));
        let finalizer = DecoratorChain::new(chain, layers::CHAIN)
            .decorate_if_available(self.reporting_hub.clone(), layers::REPORTING, |inner, hub| {
                Arc::new(ReportingFinalizer::new(inner, hub))
            })
            .build();
        debug!(worker = %worker, finalizer = %finalizer.name(), "Built worker finalizer chain");
        Some(finalizer)
    }
}

/// Assign workflows and activities by affinity and hook up the finalizer callback
fn register_on_worker(
    worker: &mut dyn Worker,
    plan: &WorkerPlan<'_>,
    discovery: &DiscoveryRegistry,
) -> AssemblyResult<(Vec<String>, Vec<String>)> {
    let workflows = assign(
        discovery.workflows(),
        plan.name,
        |w| &w.affinity,
        |w| w.workflow_type.clone(),
        |w| worker.register_workflow_type(w),
    )?;
    let activities = assign(
        discovery.activities(),
        plan.name,
        |a| &a.affinity,
        ActivityRegistration::registered_name,
        |a| worker.register_activity(a),
    )?;

    if let Some(finalizer) = &plan.finalizer {
        let finalizer = finalizer.clone();
        let context = format!("worker={} finalizer={}", plan.name, finalizer.name());
        worker.register_activity_finalizer(Arc::new(move || {
            if let Err(e) = finalizer.finalize() {
                log_error("finalizer", "finalize", &e.to_string(), Some(context.as_str()));
            }
        }))?;
    }
    Ok((workflows, activities))
}

/// Discard created workers newest first; discard failures are logged only
fn discard_all(factory: &dyn WorkerFactory, created: Vec<AssembledWorker>) {
    for assembled in created.into_iter().rev() {
        discard(factory, &assembled.name, assembled.worker);
    }
}

fn discard(factory: &dyn WorkerFactory, name: &str, worker: Box<dyn Worker>) {
    match factory.discard_worker(worker) {
        Ok(()) => debug!(worker = %name, "Discarded worker of abandoned assembly"),
        Err(e) => log_error("worker", "discard_worker", &e.to_string(), Some(name)),
    }
}

/// Register every admitted item on one worker
fn assign<T>(
    items: &[T],
    worker: &str,
    affinity: impl Fn(&T) -> &Affinity,
    label: impl Fn(&T) -> String,
    mut register: impl FnMut(&T) -> Result<(), crate::error::EngineError>,
) -> AssemblyResult<Vec<String>> {
    let mut assigned = Vec::new();
    for item in items {
        let affinity = affinity(item);
        if !affinity.admits(worker) {
            continue;
        }
        register(item)?;
        assigned.push(label(item));
    }
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, FinalizationError};
    use crate::interceptor::DefaultExceptionInterceptor;
    use crate::sdk::inspection::InspectionWorkerFactory;
    use crate::constants::services;

    struct Noop(&'static str, bool);

    impl Finalizer for Noop {
        fn finalize(&self) -> Result<(), FinalizationError> {
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }

        fn checks_connection(&self) -> bool {
            self.1
        }
    }

    struct Registries {
        exception_interceptors: NameRegistry<dyn ExceptionInterceptor>,
        interceptors: NameRegistry<dyn Interceptor>,
        finalizers: NameRegistry<dyn Finalizer>,
    }

    fn registries() -> Registries {
        let mut exception_interceptors = NameRegistry::new(ReferenceKind::ExceptionInterceptor);
        exception_interceptors
            .register(
                services::EXCEPTION_INTERCEPTOR,
                Arc::new(DefaultExceptionInterceptor::new()) as Arc<dyn ExceptionInterceptor>,
            )
            .unwrap();
        let mut finalizers = NameRegistry::new(ReferenceKind::Finalizer);
        finalizers
            .register("ping", Arc::new(Noop("ping", true)) as Arc<dyn Finalizer>)
            .unwrap();
        finalizers
            .register("flush", Arc::new(Noop("flush", false)) as Arc<dyn Finalizer>)
            .unwrap();
        Registries {
            exception_interceptors,
            interceptors: NameRegistry::new(ReferenceKind::Interceptor),
            finalizers,
        }
    }

    fn workers(entries: &[(&str, WorkerConfig)]) -> BTreeMap<String, WorkerConfig> {
        entries
            .iter()
            .map(|(name, config)| {
                let mut config = config.clone();
                config.name = name.to_string();
                (name.to_string(), config)
            })
            .collect()
    }

    #[test]
    fn test_health_layer_per_connection_finalizer() {
        let r = registries();
        let assembler = WorkerAssembler::new(&r.exception_interceptors, &r.interceptors, &r.finalizers, None);
        let mut config = WorkerConfig::new("foo");
        config.finalizers = vec!["flush".into(), "ping".into()];

        let set = assembler
            .assemble(
                &InspectionWorkerFactory::new(),
                &workers(&[("foo", config)]),
                &mut DiscoveryRegistry::new(),
            )
            .unwrap();

        let foo = &set.workers["foo"];
        assert_eq!(foo.exception_layers(), &["connection_health", "base"]);
        assert_eq!(foo.finalizer().unwrap().name(), "temporal.foo.worker.finalizer");
    }

    #[test]
    fn test_unknown_affinity_worker_fails_before_engine() {
        let r = registries();
        let assembler = WorkerAssembler::new(&r.exception_interceptors, &r.interceptors, &r.finalizers, None);
        let factory = InspectionWorkerFactory::new();
        let mut discovery = DiscoveryRegistry::new();
        discovery.register_workflow(WorkflowRegistration::new("Order").with_workers(["ghost"]));

        let err = assembler
            .assemble(&factory, &workers(&[("foo", WorkerConfig::new("foo"))]), &mut discovery)
            .unwrap_err();

        assert!(matches!(
            err,
            AssemblyError::UnresolvedReference { kind: ReferenceKind::Worker, .. }
        ));
        assert!(factory.created().is_empty());
        assert!(!discovery.is_empty());
    }

    #[test]
    fn test_engine_failure_surfaces() {
        let r = registries();
        let assembler = WorkerAssembler::new(&r.exception_interceptors, &r.interceptors, &r.finalizers, None);
        let factory = InspectionWorkerFactory::new().failing_on("foo");

        let err = assembler
            .assemble(
                &factory,
                &workers(&[("foo", WorkerConfig::new("foo"))]),
                &mut DiscoveryRegistry::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Engine(EngineError::WorkerCreation { .. })));
    }
}
