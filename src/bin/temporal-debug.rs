//! # Temporal Assembly Inspector
//!
//! Loads a configuration tree, assembles it against the recording engine and
//! prints what would be built. Nothing is dialed and nothing is run.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use temporal_assembly::assembly::{assemble, Collaborators};
use temporal_assembly::client::ClientSet;
use temporal_assembly::config::ConfigManager;
use temporal_assembly::debug::{client_summaries, worker_summaries, AssemblySummary, ClientSummary};
use temporal_assembly::logging;
use temporal_assembly::sdk::inspection::InspectionWorkerFactory;
use temporal_assembly::worker::DiscoveryRegistry;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "temporal-debug")]
#[command(about = "Inspect assembled Temporal clients and workers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (temporal.yaml)
    #[arg(short, long, conflicts_with = "config_dir")]
    config: Option<PathBuf>,

    /// Directory holding temporal.yaml and temporal.<env>.yaml overrides
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Environment used with --config-dir (defaults to TEMPORAL_ENV/APP_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show workflow and schedule clients
    Clients {
        /// Client names; all clients when omitted
        names: Vec<String>,
    },

    /// Show workers with their options and chains
    Workers {
        /// Worker names; all workers when omitted
        names: Vec<String>,
    },

    /// Print the resolved configuration with secrets masked
    Config,

    /// Assemble everything and report success or the first error
    Validate,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // An explicit RUST_LOG wins over -v
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", level.to_string().to_ascii_lowercase());
    }
    logging::init_structured_logging();

    match run(&cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            error!("temporal-debug failed: {e:#}");
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<ConfigManager> {
    if let Some(path) = &cli.config {
        return ConfigManager::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()));
    }

    let dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("config"));
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    ConfigManager::load_from_directory_with_env(&dir, &environment)
        .with_context(|| format!("loading {} for environment {environment}", dir.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let manager = load(cli)?;

    if let Some(Commands::Config) = &cli.command {
        println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
        return Ok(());
    }

    let config = manager.config();
    let collaborators = Collaborators::builder()
        .worker_factory(config.worker_factory.clone(), Arc::new(InspectionWorkerFactory::new()))
        .build()?;
    let assembly = assemble(config, &collaborators, &mut DiscoveryRegistry::new())?;
    info!(environment = %manager.environment(), "Assembly succeeded");

    let output = match &cli.command {
        Some(Commands::Clients { names }) => {
            if let Some(unknown) = names.iter().find(|name| {
                assembly.clients().get(name).is_none()
                    && assembly.schedule_clients().get(name).is_none()
            }) {
                bail!("Unknown client: {unknown}");
            }
            serde_json::json!({
                "clients": filtered_clients(assembly.clients(), names)?,
                "scheduleClients": filtered_clients(assembly.schedule_clients(), names)?,
            })
        }
        Some(Commands::Workers { names }) => {
            serde_json::to_value(worker_summaries(assembly.runtime(), names)?)?
        }
        Some(Commands::Validate) => {
            println!(
                "✅ Configuration valid: {} client(s), {} schedule client(s), {} worker(s)",
                assembly.clients().len(),
                assembly.schedule_clients().len(),
                assembly.runtime().count()
            );
            return Ok(());
        }
        Some(Commands::Config) | None => serde_json::to_value(AssemblySummary::from_assembly(&assembly)?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// A name may exist in only one of the two client sets
fn filtered_clients(clients: &ClientSet, names: &[String]) -> Result<Vec<ClientSummary>> {
    if names.is_empty() {
        return Ok(client_summaries(clients, names)?);
    }
    let present: Vec<String> = names
        .iter()
        .filter(|name| clients.get(name).is_some())
        .cloned()
        .collect();
    if present.is_empty() {
        return Ok(Vec::new());
    }
    Ok(client_summaries(clients, &present)?)
}
