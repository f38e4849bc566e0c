//! # Debug Reporting
//!
//! Read-only, serializable summaries of an [`Assembly`]. Nothing here touches
//! the engine or changes assembled objects.

use crate::assembly::Assembly;
use crate::client::{ClientHandle, ClientOptions, ClientSet, ServiceClient};
use crate::error::{AssemblyError, AssemblyResult, ReferenceKind};
use crate::finalizer::finalizer_layers;
use crate::runtime::Runtime;
use crate::worker::{AssembledWorker, RegistrationReport, WorkerOptions};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub default: bool,
    pub address: String,
    pub transport: ServiceClient,
    pub data_converter: String,
    pub options: ClientOptions,
    pub interceptors: Vec<String>,
    pub grpc_timeout_ms: u64,
}

impl ClientSummary {
    fn from_handle(handle: &ClientHandle, default: bool) -> Self {
        Self {
            id: handle.id().to_string(),
            name: handle.name().to_string(),
            default,
            address: handle.service_client().address().to_string(),
            transport: handle.service_client().clone(),
            data_converter: handle.data_converter_id().to_string(),
            options: handle.options().clone(),
            interceptors: handle.pipeline().names(),
            grpc_timeout_ms: millis(handle.grpc_context().timeout),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    pub id: String,
    pub name: String,
    pub task_queue: String,
    pub options: WorkerOptions,
    pub exception_interceptor: Vec<String>,
    pub finalizer: Option<Vec<String>>,
    pub interceptors: Vec<String>,
    pub workflows: Vec<String>,
    pub activities: Vec<String>,
}

impl WorkerSummary {
    fn from_worker(worker: &AssembledWorker) -> Self {
        Self {
            id: worker.id(),
            name: worker.name().to_string(),
            task_queue: worker.task_queue().to_string(),
            options: worker.options().clone(),
            exception_interceptor: worker.exception_layers().to_vec(),
            finalizer: worker.finalizer().map(|f| finalizer_layers(f.as_ref())),
            interceptors: worker.interceptors().to_vec(),
            workflows: worker.workflows().to_vec(),
            activities: worker.activities().to_vec(),
        }
    }
}

/// Everything the debug tooling prints for one assembly
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblySummary {
    pub clients: Vec<ClientSummary>,
    pub schedule_clients: Vec<ClientSummary>,
    pub workers: Vec<WorkerSummary>,
    pub registrations: RegistrationReport,
}

impl AssemblySummary {
    pub fn from_assembly(assembly: &Assembly) -> AssemblyResult<Self> {
        Ok(Self {
            clients: client_summaries(assembly.clients(), &[])?,
            schedule_clients: client_summaries(assembly.schedule_clients(), &[])?,
            workers: worker_summaries(assembly.runtime(), &[])?,
            registrations: assembly.report().clone(),
        })
    }
}

/// Summaries for the named clients, or all of them when `names` is empty
pub fn client_summaries(clients: &ClientSet, names: &[String]) -> AssemblyResult<Vec<ClientSummary>> {
    let default_id = clients.default_id().map(str::to_string);
    let summary = |handle: &ClientHandle| {
        ClientSummary::from_handle(handle, default_id.as_deref() == Some(handle.id()))
    };

    if names.is_empty() {
        return Ok(clients.iter().map(|handle| summary(handle.as_ref())).collect());
    }
    names
        .iter()
        .map(|name| {
            clients
                .get(name)
                .map(|handle| summary(handle.as_ref()))
                .ok_or_else(|| AssemblyError::unresolved(clients.kind().reference_kind(), name))
        })
        .collect()
}

/// Summaries for the named workers, or all of them when `names` is empty
pub fn worker_summaries(runtime: &Runtime, names: &[String]) -> AssemblyResult<Vec<WorkerSummary>> {
    if names.is_empty() {
        return Ok(runtime.workers().map(WorkerSummary::from_worker).collect());
    }
    names
        .iter()
        .map(|name| {
            runtime
                .worker(name)
                .map(WorkerSummary::from_worker)
                .ok_or_else(|| AssemblyError::unresolved(ReferenceKind::Worker, name))
        })
        .collect()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
