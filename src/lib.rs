#![allow(clippy::doc_markdown)] // Allow technical terms like YAML, TLS in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Temporal Assembly
//!
//! Declarative assembly of Temporal workflow clients, schedule clients and
//! workers.
//!
//! ## Overview
//!
//! A YAML configuration tree names clients, schedule clients and workers
//! together with the collaborators they reference (data converters,
//! exception interceptors, interceptors, finalizers). Assembly resolves every
//! reference, composes decorator chains around exception interceptors and
//! finalizers, assigns discovered workflows and activities to workers by
//! affinity, and returns a [`Runtime`] ready to hand to the execution engine.
//!
//! Assembly is all-or-nothing: a malformed tree or an unresolved name fails
//! before any worker runs.
//!
//! ## Optional collaborators
//!
//! An error-reporting hub and a connection-pool registry may be supplied.
//! Their presence decides, once at assembly time, whether reporting and
//! connection-health decorators are added:
//!
//! ```text
//! reporting ─▶ connection_health ─▶ base exception interceptor
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration model, interval parsing and file loading
//! - [`registry`] - Name → object tables with duplicate and unresolved checks
//! - [`client`] - Workflow and schedule client assembly
//! - [`worker`] - Worker assembly, options and workflow/activity discovery
//! - [`decorator`] - Generic decorator chain builder
//! - [`interceptor`] - Exception interceptors and the interceptor pipeline
//! - [`finalizer`] - Finalizer chains and connection-pool finalizers
//! - [`data_converter`] - Payload codec
//! - [`sdk`] - Seams to the execution engine and optional collaborators
//! - [`runtime`] - Runtime handle and process runner
//! - [`debug`] - Read-only summaries for inspection tooling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use temporal_assembly::assembly::{assemble, Collaborators};
//! use temporal_assembly::config::ConfigManager;
//! use temporal_assembly::constants::services;
//! use temporal_assembly::runtime::TemporalRunner;
//! use temporal_assembly::sdk::inspection::InspectionWorkerFactory;
//! use temporal_assembly::worker::DiscoveryRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! temporal_assembly::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load_from_file("config/temporal.yaml")?;
//! let collaborators = Collaborators::builder()
//!     .worker_factory(services::WORKER_FACTORY, Arc::new(InspectionWorkerFactory::new()))
//!     .build()?;
//!
//! let assembly = assemble(manager.config(), &collaborators, &mut DiscoveryRegistry::new())?;
//! let exit_code = TemporalRunner::new(assembly.into_runtime()).run().await;
//! std::process::exit(exit_code);
//! # }
//! ```

pub mod assembly;
pub mod client;
pub mod config;
pub mod constants;
pub mod data_converter;
pub mod debug;
pub mod decorator;
pub mod error;
pub mod finalizer;
pub mod interceptor;
pub mod logging;
pub mod registry;
pub mod runtime;
pub mod sdk;
pub mod worker;

pub use assembly::{assemble, Assembly, Collaborators, CollaboratorsBuilder};
pub use client::{ClientHandle, ClientKind, ClientSet};
pub use config::{ConfigManager, TemporalConfig};
pub use error::{AssemblyError, AssemblyResult, ErrorKind, ReferenceKind};
pub use runtime::{Runtime, TemporalRunner};
pub use worker::{ActivityRegistration, DiscoveryRegistry, WorkflowRegistration};
