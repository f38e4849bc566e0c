//! # Assembly
//!
//! Entry point turning a validated [`TemporalConfig`] plus the host's
//! collaborators into clients, schedule clients and a [`Runtime`].
//!
//! Optional collaborators (error-reporting hub, connection-pool registry) are
//! passed explicitly. Built-in objects depending on them are registered only
//! when they are present, and only under names the host left free.
//!
//! ```rust
//! use std::sync::Arc;
//! use temporal_assembly::assembly::{assemble, Collaborators};
//! use temporal_assembly::config::TemporalConfig;
//! use temporal_assembly::constants::services;
//! use temporal_assembly::sdk::inspection::InspectionWorkerFactory;
//! use temporal_assembly::worker::{DiscoveryRegistry, WorkflowRegistration};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TemporalConfig::parse(
//!     r#"
//! workers:
//!   default:
//!     taskQueue: default
//! "#,
//! )?;
//! let collaborators = Collaborators::builder()
//!     .worker_factory(services::WORKER_FACTORY, Arc::new(InspectionWorkerFactory::new()))
//!     .build()?;
//! let mut discovery = DiscoveryRegistry::new();
//! discovery.register_workflow(WorkflowRegistration::new("OrderWorkflow"));
//!
//! let assembly = assemble(&config, &collaborators, &mut discovery)?;
//! assert_eq!(assembly.runtime().count(), 1);
//! assert!(discovery.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::client::{ClientAssembler, ClientKind, ClientSet};
use crate::config::TemporalConfig;
use crate::constants::{ids, layers, services};
use crate::data_converter::{DataConverter, JsonDataConverter};
use crate::error::{AssemblyResult, ReferenceKind};
use crate::finalizer::{ClearConnectionsFinalizer, Finalizer, PingConnectionFinalizer};
use crate::decorator::DecoratorChain;
use crate::interceptor::activity::{
    ConnectionHealthActivityInterceptor, ConnectionHealthWorkflowInterceptor,
    ReportingActivityInterceptor, ReportingWorkflowInterceptor,
};
use crate::interceptor::{
    ConnectionHealthExceptionInterceptor, DefaultExceptionInterceptor, ExceptionInterceptor, Interceptor,
};
use crate::logging::log_assembly_operation;
use crate::registry::NameRegistry;
use crate::runtime::Runtime;
use crate::sdk::{ConnectionPoolRegistry, ErrorReportingHub, WorkerFactory};
use crate::worker::{DiscoveryRegistry, RegistrationReport, WorkerAssembler};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolved name tables plus the optional collaborators
pub struct Collaborators {
    worker_factories: NameRegistry<dyn WorkerFactory>,
    data_converters: NameRegistry<dyn DataConverter>,
    exception_interceptors: NameRegistry<dyn ExceptionInterceptor>,
    interceptors: NameRegistry<dyn Interceptor>,
    finalizers: NameRegistry<dyn Finalizer>,
    reporting_hub: Option<Arc<dyn ErrorReportingHub>>,
    pool_registry: Option<Arc<dyn ConnectionPoolRegistry>>,
}

impl Collaborators {
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::default()
    }

    pub fn worker_factories(&self) -> &NameRegistry<dyn WorkerFactory> {
        &self.worker_factories
    }

    pub fn data_converters(&self) -> &NameRegistry<dyn DataConverter> {
        &self.data_converters
    }

    pub fn exception_interceptors(&self) -> &NameRegistry<dyn ExceptionInterceptor> {
        &self.exception_interceptors
    }

    pub fn interceptors(&self) -> &NameRegistry<dyn Interceptor> {
        &self.interceptors
    }

    pub fn finalizers(&self) -> &NameRegistry<dyn Finalizer> {
        &self.finalizers
    }

    pub fn reporting_hub(&self) -> Option<&Arc<dyn ErrorReportingHub>> {
        self.reporting_hub.as_ref()
    }

    pub fn pool_registry(&self) -> Option<&Arc<dyn ConnectionPoolRegistry>> {
        self.pool_registry.as_ref()
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("worker_factories", &self.worker_factories)
            .field("data_converters", &self.data_converters)
            .field("exception_interceptors", &self.exception_interceptors)
            .field("interceptors", &self.interceptors)
            .field("finalizers", &self.finalizers)
            .field("reporting_hub", &self.reporting_hub.is_some())
            .field("pool_registry", &self.pool_registry.is_some())
            .finish()
    }
}

/// Collects host-provided objects; name clashes surface from [`build`](Self::build)
#[derive(Default)]
pub struct CollaboratorsBuilder {
    worker_factories: Vec<(String, Arc<dyn WorkerFactory>)>,
    data_converters: Vec<(String, Arc<dyn DataConverter>)>,
    exception_interceptors: Vec<(String, Arc<dyn ExceptionInterceptor>)>,
    interceptors: Vec<(String, Arc<dyn Interceptor>)>,
    finalizers: Vec<(String, Arc<dyn Finalizer>)>,
    reporting_hub: Option<Arc<dyn ErrorReportingHub>>,
    pool_registry: Option<Arc<dyn ConnectionPoolRegistry>>,
}

impl CollaboratorsBuilder {
    pub fn worker_factory(mut self, name: impl Into<String>, factory: Arc<dyn WorkerFactory>) -> Self {
        self.worker_factories.push((name.into(), factory));
        self
    }

    pub fn data_converter(mut self, name: impl Into<String>, converter: Arc<dyn DataConverter>) -> Self {
        self.data_converters.push((name.into(), converter));
        self
    }

    pub fn exception_interceptor(
        mut self,
        name: impl Into<String>,
        interceptor: Arc<dyn ExceptionInterceptor>,
    ) -> Self {
        self.exception_interceptors.push((name.into(), interceptor));
        self
    }

    pub fn interceptor(mut self, name: impl Into<String>, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push((name.into(), interceptor));
        self
    }

    pub fn finalizer(mut self, name: impl Into<String>, finalizer: Arc<dyn Finalizer>) -> Self {
        self.finalizers.push((name.into(), finalizer));
        self
    }

    pub fn reporting_hub(mut self, hub: Arc<dyn ErrorReportingHub>) -> Self {
        self.reporting_hub = Some(hub);
        self
    }

    pub fn pool_registry(mut self, registry: Arc<dyn ConnectionPoolRegistry>) -> Self {
        self.pool_registry = Some(registry);
        self
    }

    /// Register host objects, then the built-ins whose names are still free
    pub fn build(self) -> AssemblyResult<Collaborators> {
        let mut collaborators = Collaborators {
            worker_factories: registry(ReferenceKind::WorkerFactory, self.worker_factories)?,
            data_converters: registry(ReferenceKind::DataConverter, self.data_converters)?,
            exception_interceptors: registry(
                ReferenceKind::ExceptionInterceptor,
                self.exception_interceptors,
            )?,
            interceptors: registry(ReferenceKind::Interceptor, self.interceptors)?,
            finalizers: registry(ReferenceKind::Finalizer, self.finalizers)?,
            reporting_hub: self.reporting_hub,
            pool_registry: self.pool_registry,
        };
        register_builtins(&mut collaborators)?;

        debug!(
            data_converters = ?collaborators.data_converters.names(),
            exception_interceptors = ?collaborators.exception_interceptors.names(),
            interceptors = ?collaborators.interceptors.names(),
            finalizers = ?collaborators.finalizers.names(),
            reporting_hub = collaborators.reporting_hub.is_some(),
            pool_registry = collaborators.pool_registry.is_some(),
            "Collaborators ready"
        );
        Ok(collaborators)
    }
}

fn registry<T: ?Sized>(kind: ReferenceKind, entries: Vec<(String, Arc<T>)>) -> AssemblyResult<NameRegistry<T>> {
    let mut registry = NameRegistry::new(kind);
    for (name, value) in entries {
        registry.register(name, value)?;
    }
    Ok(registry)
}

fn register_if_absent<T: ?Sized>(
    registry: &mut NameRegistry<T>,
    name: &str,
    make: impl FnOnce() -> Arc<T>,
) -> AssemblyResult<()> {
    if registry.contains(name) {
        debug!(name = %name, "Host object overrides built-in");
        return Ok(());
    }
    registry.register(name, make())
}

fn register_builtins(collaborators: &mut Collaborators) -> AssemblyResult<()> {
    register_if_absent(&mut collaborators.data_converters, services::DATA_CONVERTER, || {
        Arc::new(JsonDataConverter::new())
    })?;
    register_if_absent(
        &mut collaborators.exception_interceptors,
        services::EXCEPTION_INTERCEPTOR,
        || Arc::new(DefaultExceptionInterceptor::new()),
    )?;

    if let Some(pools) = collaborators.pool_registry.clone() {
        let mut ping_finalizers: Vec<Arc<dyn Finalizer>> = Vec::new();
        for pool in pools.pool_names() {
            let id = ids::ping_connection_finalizer(&pool);
            register_if_absent(&mut collaborators.finalizers, &id, || {
                Arc::new(PingConnectionFinalizer::new(pools.clone(), pool.as_str()))
            })?;
            ping_finalizers.push(collaborators.finalizers.resolve(&id)?);
        }

        register_if_absent(
            &mut collaborators.finalizers,
            services::CLEAR_CONNECTIONS_FINALIZER,
            || Arc::new(ClearConnectionsFinalizer::new(pools.clone())),
        )?;
        // One health layer per pool around the base exception interceptor
        let base = collaborators
            .exception_interceptors
            .resolve(services::EXCEPTION_INTERCEPTOR)?;
        let base_label = base.layer_name().to_string();
        let health_chain = ping_finalizers
            .iter()
            .fold(DecoratorChain::new(base, base_label), |chain, finalizer| {
                let finalizer = finalizer.clone();
                chain.decorate(layers::CONNECTION_HEALTH, |inner| {
                    Arc::new(ConnectionHealthExceptionInterceptor::new(inner, finalizer))
                })
            })
            .build();

        register_if_absent(
            &mut collaborators.interceptors,
            services::CONNECTION_HEALTH_ACTIVITY_INBOUND_INTERCEPTOR,
            || Arc::new(ConnectionHealthActivityInterceptor::new(ping_finalizers)),
        )?;
        register_if_absent(
            &mut collaborators.interceptors,
            services::CONNECTION_HEALTH_WORKFLOW_OUTBOUND_INTERCEPTOR,
            || Arc::new(ConnectionHealthWorkflowInterceptor::new(health_chain)),
        )?;
    }

    if let Some(hub) = collaborators.reporting_hub.clone() {
        register_if_absent(
            &mut collaborators.interceptors,
            services::REPORTING_ACTIVITY_INBOUND_INTERCEPTOR,
            || Arc::new(ReportingActivityInterceptor::new(hub.clone())),
        )?;
        register_if_absent(
            &mut collaborators.interceptors,
            services::REPORTING_WORKFLOW_OUTBOUND_INTERCEPTOR,
            || Arc::new(ReportingWorkflowInterceptor::new(hub)),
        )?;
    }
    Ok(())
}

/// Result of a successful assembly
pub struct Assembly {
    clients: ClientSet,
    schedule_clients: ClientSet,
    runtime: Runtime,
    report: RegistrationReport,
}

impl Assembly {
    pub fn clients(&self) -> &ClientSet {
        &self.clients
    }

    pub fn schedule_clients(&self) -> &ClientSet {
        &self.schedule_clients
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Registrations attached to every worker because they declared no affinity
    pub fn report(&self) -> &RegistrationReport {
        &self.report
    }

    pub fn into_runtime(self) -> Runtime {
        self.runtime
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("clients", &self.clients)
            .field("schedule_clients", &self.schedule_clients)
            .field("runtime", &self.runtime)
            .field("report", &self.report)
            .finish()
    }
}

/// Build everything the configuration describes; any error aborts the whole assembly
pub fn assemble(
    config: &TemporalConfig,
    collaborators: &Collaborators,
    discovery: &mut DiscoveryRegistry,
) -> AssemblyResult<Assembly> {
    config.validate()?;

    let clients = ClientAssembler::new(&collaborators.data_converters, &collaborators.interceptors);
    let workflow_clients = clients.assemble(ClientKind::Workflow, &config.clients, &config.default_client)?;
    let schedule_clients = clients.assemble(
        ClientKind::Schedule,
        &config.schedule_clients,
        &config.default_schedule_client,
    )?;

    let factory = collaborators.worker_factories.resolve(&config.worker_factory)?;
    let workers = WorkerAssembler::new(
        &collaborators.exception_interceptors,
        &collaborators.interceptors,
        &collaborators.finalizers,
        collaborators.reporting_hub.clone(),
    )
    .assemble(factory.as_ref(), &config.workers, discovery)?;

    log_assembly_operation(
        "assemble",
        "temporal",
        None,
        "completed",
        Some(&format!(
            "clients={} schedule_clients={} workers={}",
            workflow_clients.len(),
            schedule_clients.len(),
            workers.workers.len()
        )),
    );
    info!(workers = workers.workers.len(), "Temporal assembly complete");

    Ok(Assembly {
        clients: workflow_clients,
        schedule_clients,
        runtime: Runtime::new(factory, workers.workers),
        report: workers.report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssemblyError, PoolError};
    use crate::sdk::inspection::InspectionWorkerFactory;
    use crate::sdk::ConnectionPool;

    struct Pool;

    impl ConnectionPool for Pool {
        fn ping(&self) -> Result<(), PoolError> {
            Ok(())
        }

        fn reconnect(&self) -> Result<(), PoolError> {
            Ok(())
        }

        fn reset(&self) -> Result<(), PoolError> {
            Ok(())
        }
    }

    struct Pools;

    impl ConnectionPoolRegistry for Pools {
        fn pool_names(&self) -> Vec<String> {
            vec!["default".to_string(), "audit".to_string()]
        }

        fn pool(&self, _name: &str) -> Option<Arc<dyn ConnectionPool>> {
            Some(Arc::new(Pool))
        }
    }

    #[test]
    fn test_builtins_without_optional_collaborators() {
        let collaborators = Collaborators::builder().build().unwrap();

        assert!(collaborators.data_converters().contains(services::DATA_CONVERTER));
        assert!(collaborators
            .exception_interceptors()
            .contains(services::EXCEPTION_INTERCEPTOR));
        assert!(collaborators.finalizers().is_empty());
        assert!(collaborators.interceptors().is_empty());
    }

    #[test]
    fn test_pool_derived_finalizers() {
        let collaborators = Collaborators::builder()
            .pool_registry(Arc::new(Pools))
            .build()
            .unwrap();

        assert_eq!(
            collaborators.finalizers().names(),
            vec![
                "temporal.clear_connections.finalizer",
                "temporal.ping_connection_audit.finalizer",
                "temporal.ping_connection_default.finalizer",
            ]
        );
        assert!(collaborators
            .interceptors()
            .contains(services::CONNECTION_HEALTH_ACTIVITY_INBOUND_INTERCEPTOR));
        assert!(collaborators
            .interceptors()
            .contains(services::CONNECTION_HEALTH_WORKFLOW_OUTBOUND_INTERCEPTOR));
        assert!(!collaborators
            .interceptors()
            .contains(services::REPORTING_ACTIVITY_INBOUND_INTERCEPTOR));
    }

    #[test]
    fn test_host_duplicates_rejected() {
        let err = Collaborators::builder()
            .worker_factory("engine", Arc::new(InspectionWorkerFactory::new()))
            .worker_factory("engine", Arc::new(InspectionWorkerFactory::new()))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::DuplicateName { kind: ReferenceKind::WorkerFactory, .. }
        ));
    }

    #[test]
    fn test_missing_worker_factory() {
        let config = TemporalConfig::default();
        let collaborators = Collaborators::builder().build().unwrap();
        let err = assemble(&config, &collaborators, &mut DiscoveryRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::UnresolvedReference { kind: ReferenceKind::WorkerFactory, .. }
        ));
    }
}
