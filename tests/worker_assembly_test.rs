mod common;

use common::strategies::*;
use common::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use temporal_assembly::assembly::assemble;
use temporal_assembly::error::{AssemblyError, ReferenceKind};
use temporal_assembly::finalizer::Finalizer;
use temporal_assembly::worker::{ActivityRegistration, DiscoveryRegistry, WorkflowRegistration};

fn finalizers_yaml(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("\"{name}\"")).collect();
    format!(
        "workers:\n  foo:\n    taskQueue: foo\n    finalizers: [{}]\n",
        quoted.join(", ")
    )
}

proptest! {
    /// Property: the chain finalizer runs every listed finalizer once, in order,
    /// even when earlier ones fail
    #[test]
    fn chain_finalizer_runs_every_entry_in_order(plan in finalizer_plan_strategy()) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut builder, factory) = collaborators_with_engine();
        for (name, fail) in &plan {
            let mut finalizer = LoggingFinalizer::new(name.clone(), log.clone());
            if *fail {
                finalizer = finalizer.failing();
            }
            builder = builder.finalizer(name.clone(), Arc::new(finalizer));
        }
        let collaborators = builder.build().unwrap();
        let names: Vec<String> = plan.iter().map(|(name, _)| name.clone()).collect();
        let config = config_from_yaml(&finalizers_yaml(&names)).unwrap();

        let assembly = assemble(&config, &collaborators, &mut DiscoveryRegistry::new()).unwrap();

        // Through the engine callback: failures are logged and swallowed
        factory.created()[0].run_activity_finalizers();
        prop_assert_eq!(&*log.lock(), &names);

        // Direct call reports the aggregate outcome
        log.lock().clear();
        let result = assembly.runtime().worker("foo").unwrap().finalizer().unwrap().finalize();
        prop_assert_eq!(&*log.lock(), &names);
        prop_assert_eq!(result.is_err(), plan.iter().any(|(_, fail)| *fail));
    }

    /// Property: registrations without affinity go to every worker and are
    /// reported once; registrations with affinity go to exactly the named workers
    #[test]
    fn affinity_assignment((workers, workflows) in affinity_strategy()) {
        let register = || {
            let mut discovery = DiscoveryRegistry::new();
            for (workflow, affinity) in &workflows {
                discovery.register_workflow(
                    WorkflowRegistration::new(workflow.clone()).with_workers(affinity.iter().cloned()),
                );
            }
            discovery
        };

        let mut discovery = register();
        let (assembly, _) = assemble_yaml(&workers_yaml(&workers), &mut discovery).unwrap();
        prop_assert!(discovery.is_empty());

        for (workflow, affinity) in &workflows {
            for worker in &workers {
                let attached = assembly
                    .runtime()
                    .worker(worker)
                    .unwrap()
                    .workflows()
                    .iter()
                    .filter(|name| *name == workflow)
                    .count();
                let expected = usize::from(affinity.is_empty() || affinity.contains(worker));
                prop_assert_eq!(attached, expected);
            }
            prop_assert_eq!(
                assembly.report().workflows_without_workers.contains(workflow),
                affinity.is_empty()
            );
        }

        // A second run over the same registrations reports the same set
        let (again, _) = assemble_yaml(&workers_yaml(&workers), &mut register()).unwrap();
        prop_assert_eq!(again.report(), assembly.report());
    }

    /// Property: interval tunables are parsed at load time into durations
    #[test]
    fn interval_tunables_become_durations((raw, expected) in interval_strategy()) {
        let yaml = format!("workers:\n  foo:\n    taskQueue: foo\n    workerStopTimeout: {raw}\n");
        let (assembly, _) = assemble_yaml(&yaml, &mut DiscoveryRegistry::new()).unwrap();
        let options = assembly.runtime().worker("foo").unwrap().options();
        prop_assert_eq!(options.worker_stop_timeout, Some(expected));
    }
}

#[test]
fn test_tunables_mapped_by_key() {
    let yaml = r#"
workers:
  foo:
    taskQueue: foo
    maxConcurrentActivityExecutionSize: 10
    workerActivitiesPerSecond: 2.5
    enableSessionWorker: true
    deadlockDetectionTimeout: 1 minute
    maxConcurrentEagerActivityExecutionSize: 4
"#;
    let (assembly, factory) = assemble_yaml(yaml, &mut DiscoveryRegistry::new()).unwrap();

    let options = factory.created()[0].options().clone();
    assert_eq!(options.max_concurrent_activity_execution_size, 10);
    assert_eq!(options.worker_activities_per_second, 2.5);
    assert_eq!(options.max_concurrent_session_execution_size, 1000);
    assert_eq!(options.deadlock_detection_timeout, Some(Duration::from_secs(60)));
    assert!(options.worker_stop_timeout.is_none());
    assert!(options
        .applied
        .contains(&"with_deadlock_detection_timeout".to_string()));
    assert!(!options
        .applied
        .contains(&"with_worker_stop_timeout".to_string()));

    let session_id = options.session_resource_id.clone().unwrap();
    assert!(uuid::Uuid::parse_str(&session_id).is_ok());
    assert_eq!(assembly.runtime().worker("foo").unwrap().options(), &options);
}

#[test]
fn test_activity_prefix_and_affinity() {
    let mut discovery = DiscoveryRegistry::new();
    discovery
        .register_activity(ActivityRegistration::new("Charge").with_prefix("billing."))
        .register_activity(ActivityRegistration::new("Ship").with_workers(["bar"]))
        .register_workflow(WorkflowRegistration::new("OrderWorkflow").with_workers(["foo"]));

    let names = vec!["bar".to_string(), "foo".to_string()];
    let (assembly, factory) = assemble_yaml(&workers_yaml(&names), &mut discovery).unwrap();
    let runtime = assembly.runtime();

    assert_eq!(runtime.worker("foo").unwrap().activities(), &["billing.Charge"]);
    assert_eq!(runtime.worker("bar").unwrap().activities(), &["billing.Charge", "Ship"]);
    assert_eq!(runtime.worker("foo").unwrap().workflows(), &["OrderWorkflow"]);
    assert!(runtime.worker("bar").unwrap().workflows().is_empty());

    let report = assembly.report();
    assert_eq!(
        report.activities_without_workers.iter().collect::<Vec<_>>(),
        vec!["billing.Charge"]
    );
    assert!(report.workflows_without_workers.is_empty());

    let recorded: Vec<Vec<String>> = factory.created().iter().map(|w| w.activity_types()).collect();
    assert_eq!(
        recorded,
        vec![
            vec!["billing.Charge".to_string(), "Ship".to_string()],
            vec!["billing.Charge".to_string()],
        ]
    );
}

#[test]
fn test_unresolved_finalizer_leaves_discovery_untouched() {
    let mut discovery = DiscoveryRegistry::new();
    discovery.register_workflow(WorkflowRegistration::new("OrderWorkflow"));

    let yaml = finalizers_yaml(&["app.missing.finalizer".to_string()]);
    let config = config_from_yaml(&yaml).unwrap();
    let (builder, factory) = collaborators_with_engine();
    let err = assemble(&config, &builder.build().unwrap(), &mut discovery).unwrap_err();

    assert!(matches!(
        err,
        AssemblyError::UnresolvedReference { kind: ReferenceKind::Finalizer, ref name } if name == "app.missing.finalizer"
    ));
    assert!(factory.created().is_empty());
    assert_eq!(discovery.workflows().len(), 1);
}

#[test]
fn test_repeated_finalizer_rejected_before_any_worker() {
    let yaml = finalizers_yaml(&["x".to_string(), "x".to_string()]);
    let err = config_from_yaml(&yaml).unwrap_err();
    assert!(matches!(err, AssemblyError::RepeatedEntry { ref entry, .. } if entry == "x"));

    // A tree built in code is validated again by assemble
    let mut config = config_from_yaml(&workers_yaml(&["foo".to_string()])).unwrap();
    config
        .workers
        .get_mut("foo")
        .unwrap()
        .finalizers = vec!["x".to_string(), "x".to_string()];
    let (builder, factory) = collaborators_with_engine();
    let log = Arc::new(Mutex::new(Vec::new()));
    let collaborators = builder
        .finalizer("x", Arc::new(LoggingFinalizer::new("x", log)))
        .build()
        .unwrap();

    let err = assemble(&config, &collaborators, &mut DiscoveryRegistry::new()).unwrap_err();
    assert!(matches!(err, AssemblyError::RepeatedEntry { .. }));
    assert!(factory.created().is_empty());
}

#[test]
fn test_worker_without_finalizers_registers_none() {
    let (assembly, factory) =
        assemble_yaml(&workers_yaml(&["foo".to_string()]), &mut DiscoveryRegistry::new()).unwrap();
    assert!(assembly.runtime().worker("foo").unwrap().finalizer().is_none());
    assert_eq!(factory.created()[0].finalizer_count(), 0);
}
