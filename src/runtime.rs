//! # Runtime Handle
//!
//! Aggregates the assembled workers and hands control to the engine. The
//! handle is immutable once built: workers can be inspected but not added or
//! replaced.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use temporal_assembly::runtime::{Runtime, TemporalRunner};
//! use temporal_assembly::sdk::inspection::InspectionWorkerFactory;
//!
//! # tokio_test::block_on(async {
//! let runner = TemporalRunner::new(Runtime::new(
//!     Arc::new(InspectionWorkerFactory::new()),
//!     BTreeMap::new(),
//! ));
//! assert_eq!(runner.run().await, 0);
//! # });
//! ```

use crate::error::EngineError;
use crate::sdk::WorkerFactory;
use crate::worker::AssembledWorker;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

pub struct Runtime {
    factory: Arc<dyn WorkerFactory>,
    workers: BTreeMap<String, AssembledWorker>,
}

impl Runtime {
    pub fn new(factory: Arc<dyn WorkerFactory>, workers: BTreeMap<String, AssembledWorker>) -> Self {
        Self { factory, workers }
    }

    /// Run the engine's poll loop until shutdown
    pub async fn run(&self) -> Result<(), EngineError> {
        info!(workers = self.workers.len(), "Starting execution engine");
        self.factory.run().await
    }

    /// Number of assembled workers
    pub fn count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn worker(&self, name: &str) -> Option<&AssembledWorker> {
        self.workers.get(name)
    }

    pub fn workers(&self) -> impl Iterator<Item = &AssembledWorker> {
        self.workers.values()
    }

    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("workers", &self.worker_names())
            .finish()
    }
}

/// Process entry point around a [`Runtime`]
#[derive(Debug)]
pub struct TemporalRunner {
    runtime: Runtime,
}

impl TemporalRunner {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Run to completion and return the process exit code
    pub async fn run(&self) -> i32 {
        match self.runtime.run().await {
            Ok(()) => {
                info!("Execution engine stopped");
                0
            }
            Err(e) => {
                error!(error = %e, "Execution engine failed");
                1
            }
        }
    }
}
