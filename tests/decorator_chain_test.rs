mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use temporal_assembly::assembly::assemble;
use temporal_assembly::interceptor::{chain_depth, chain_layers};
use temporal_assembly::finalizer::finalizer_layers;
use temporal_assembly::sdk::TaskFailure;
use temporal_assembly::worker::DiscoveryRegistry;

const WORKERS_WITH_PING: &str = r#"
workers:
  foo:
    taskQueue: foo
    finalizers:
      - temporal.ping_connection_default.finalizer
      - temporal.clear_connections.finalizer
  bar:
    taskQueue: bar
"#;

#[test]
fn test_no_optional_collaborators_leaves_base_unchanged() {
    let yaml = "workers:\n  foo:\n    taskQueue: foo\n  bar:\n    taskQueue: bar\n";
    let (assembly, factory) = assemble_yaml(yaml, &mut DiscoveryRegistry::new()).unwrap();

    for worker in assembly.runtime().workers() {
        assert_eq!(chain_depth(worker.exception_interceptor().as_ref()), 1);
        assert_eq!(worker.exception_layers(), &["base"]);
    }
    for record in factory.created() {
        assert_eq!(chain_depth(record.exception_interceptor().as_ref()), 1);
    }
}

#[test]
fn test_reporting_outermost_health_innermost() {
    let pools = Arc::new(ScriptedPools::with_pools(&["default"]));
    let hub = Arc::new(RecordingHub::default());
    let (builder, _factory) = collaborators_with_engine();
    let collaborators = builder
        .reporting_hub(hub.clone())
        .pool_registry(pools.clone())
        .build()
        .unwrap();
    let config = config_from_yaml(WORKERS_WITH_PING).unwrap();

    let assembly = assemble(&config, &collaborators, &mut DiscoveryRegistry::new()).unwrap();
    let runtime = assembly.runtime();

    let foo = runtime.worker("foo").unwrap();
    assert_eq!(
        chain_layers(foo.exception_interceptor().as_ref()),
        vec!["reporting", "connection_health", "base"]
    );
    assert_eq!(foo.exception_layers(), &["reporting", "connection_health", "base"]);

    // No ping finalizer listed: reporting only
    let bar = runtime.worker("bar").unwrap();
    assert_eq!(bar.exception_layers(), &["reporting", "base"]);

    // Finalizer chain gets the reporting layer too
    assert_eq!(
        finalizer_layers(foo.finalizer().unwrap().as_ref()),
        vec!["reporting", "temporal.foo.worker.finalizer"]
    );
}

#[test]
fn test_decorators_delegate_once_and_keep_the_answer() {
    let pools = Arc::new(ScriptedPools::with_pools(&["default"]));
    let hub = Arc::new(RecordingHub::failing());
    let (builder, _factory) = collaborators_with_engine();
    let collaborators = builder
        .reporting_hub(hub.clone())
        .pool_registry(pools.clone())
        .build()
        .unwrap();
    let config = config_from_yaml(WORKERS_WITH_PING).unwrap();
    let assembly = assemble(&config, &collaborators, &mut DiscoveryRegistry::new()).unwrap();
    let interceptor = assembly.runtime().worker("foo").unwrap().exception_interceptor().clone();

    // Reporting fails, the base answer still comes back
    let retryable = TaskFailure::application("Timeout", "upstream slow");
    assert!(interceptor.is_retryable(&retryable));
    assert!(!interceptor.is_retryable(&retryable.clone().non_retryable()));
    assert_eq!(hub.scopes().len(), 2);

    // A closed connection triggers the ping finalizer before delegating
    let pool = pools.pools["default"].clone();
    pool.ping_fails.store(true, Ordering::SeqCst);
    assert!(interceptor.is_retryable(&TaskFailure::connection_closed("gone away")));
    assert_eq!(pool.pings.load(Ordering::SeqCst), 1);
    assert_eq!(pool.reconnects.load(Ordering::SeqCst), 1);

    // Application failures do not touch the pool
    interceptor.is_retryable(&retryable);
    assert_eq!(pool.pings.load(Ordering::SeqCst), 1);
}

#[test]
fn test_worker_finalizer_keeps_pool_usable() {
    let pools = Arc::new(ScriptedPools::with_pools(&["default"]));
    let (builder, factory) = collaborators_with_engine();
    let collaborators = builder.pool_registry(pools.clone()).build().unwrap();
    let config = config_from_yaml(WORKERS_WITH_PING).unwrap();
    assemble(&config, &collaborators, &mut DiscoveryRegistry::new()).unwrap();

    let pool = pools.pools["default"].clone();
    pool.closed.store(true, Ordering::SeqCst);

    let foo = factory
        .created()
        .into_iter()
        .find(|record| record.task_queue() == "foo")
        .unwrap();
    foo.run_activity_finalizers();

    assert_eq!(pool.pings.load(Ordering::SeqCst), 1);
    assert_eq!(pool.resets.load(Ordering::SeqCst), 1);
    assert_eq!(pool.clears.load(Ordering::SeqCst), 1);
    assert!(!pool.closed.load(Ordering::SeqCst));
}
