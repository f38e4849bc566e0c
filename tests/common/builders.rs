use std::sync::Arc;
use temporal_assembly::assembly::{assemble, Assembly, Collaborators, CollaboratorsBuilder};
use temporal_assembly::config::TemporalConfig;
use temporal_assembly::constants::services;
use temporal_assembly::error::{AssemblyError, AssemblyResult};
use temporal_assembly::sdk::inspection::InspectionWorkerFactory;
use temporal_assembly::worker::DiscoveryRegistry;

pub const TEST_ADDRESS: &str = "temporal:7233";

/// Parse and validate a bare configuration tree without reading the environment
pub fn config_from_yaml(yaml: &str) -> AssemblyResult<TemporalConfig> {
    let mut config: TemporalConfig = serde_yaml::from_str(yaml)
        .map_err(|e| AssemblyError::configuration("temporal", e.to_string()))?;
    config.apply_defaults(TEST_ADDRESS);
    config.validate()?;
    Ok(config)
}

/// Collaborators builder with a recording engine registered as the default factory
pub fn collaborators_with_engine() -> (CollaboratorsBuilder, Arc<InspectionWorkerFactory>) {
    let factory = Arc::new(InspectionWorkerFactory::new());
    let builder = Collaborators::builder().worker_factory(services::WORKER_FACTORY, factory.clone());
    (builder, factory)
}

/// Assemble `yaml` with only the built-in collaborators
pub fn assemble_yaml(
    yaml: &str,
    discovery: &mut DiscoveryRegistry,
) -> AssemblyResult<(Assembly, Arc<InspectionWorkerFactory>)> {
    let config = config_from_yaml(yaml)?;
    let (builder, factory) = collaborators_with_engine();
    let collaborators = builder.build()?;
    let assembly = assemble(&config, &collaborators, discovery)?;
    Ok((assembly, factory))
}

/// YAML for workers named `names`, each on a task queue of the same name
pub fn workers_yaml(names: &[String]) -> String {
    let mut yaml = String::from("workers:\n");
    for name in names {
        yaml.push_str(&format!("  {name}:\n    taskQueue: {name}\n"));
    }
    yaml
}
