//! # Client Assembly
//!
//! Builds one workflow client per `clients` entry and one schedule client per
//! `scheduleClients` entry. Each client gets:
//!
//! - a transport: plain from the address, or TLS when a key/certificate pair
//!   is configured
//! - options applied through the `with_*` chain (namespace, then identity and
//!   query-rejection condition when present)
//! - the interceptor pipeline, in listed order
//! - the data converter resolved by name
//!
//! Exactly one client per kind is the default, selected by the configured
//! default name. An unmatched default name fails the assembly.

pub mod options;
pub mod transport;

use crate::config::ClientConfig;
use crate::constants::ids;
use crate::data_converter::DataConverter;
use crate::error::{AssemblyError, AssemblyResult, ReferenceKind};
use crate::interceptor::pipeline::{Interceptor, InterceptorPipeline};
use crate::registry::NameRegistry;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use options::ClientOptions;
pub use transport::ServiceClient;

/// Workflow client or schedule client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    Workflow,
    Schedule,
}

impl ClientKind {
    pub fn id(self, name: &str) -> String {
        match self {
            ClientKind::Workflow => ids::workflow_client(name),
            ClientKind::Schedule => ids::schedule_client(name),
        }
    }

    pub fn alias(self, name: &str) -> String {
        match self {
            ClientKind::Workflow => ids::workflow_client_alias(name),
            ClientKind::Schedule => ids::schedule_client_alias(name),
        }
    }

    pub fn reference_kind(self) -> ReferenceKind {
        match self {
            ClientKind::Workflow => ReferenceKind::Client,
            ClientKind::Schedule => ReferenceKind::ScheduleClient,
        }
    }

    fn config_section(self) -> &'static str {
        match self {
            ClientKind::Workflow => "temporal.clients",
            ClientKind::Schedule => "temporal.scheduleClients",
        }
    }
}

/// Retry policy with intervals already parsed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub initial_interval: Option<Duration>,
    pub maximum_interval: Option<Duration>,
    pub backoff_coefficient: Option<f64>,
    pub maximum_attempts: u32,
    pub non_retryable_exceptions: Vec<String>,
}

/// Resolved gRPC call context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcContext {
    pub timeout: Duration,
    pub options: BTreeMap<String, JsonValue>,
    pub metadata: BTreeMap<String, JsonValue>,
    pub retry_policy: Option<RetryPolicy>,
}

/// An assembled client; connections are established later by the engine
pub struct ClientHandle {
    id: String,
    name: String,
    kind: ClientKind,
    service_client: ServiceClient,
    options: ClientOptions,
    data_converter_id: String,
    data_converter: Arc<dyn DataConverter>,
    pipeline: InterceptorPipeline,
    grpc_context: GrpcContext,
}

impl ClientHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClientKind {
        self.kind
    }

    pub fn service_client(&self) -> &ServiceClient {
        &self.service_client
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn data_converter_id(&self) -> &str {
        &self.data_converter_id
    }

    pub fn data_converter(&self) -> &Arc<dyn DataConverter> {
        &self.data_converter
    }

    pub fn pipeline(&self) -> &InterceptorPipeline {
        &self.pipeline
    }

    pub fn grpc_context(&self) -> &GrpcContext {
        &self.grpc_context
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("service_client", &self.service_client)
            .field("options", &self.options)
            .field("data_converter_id", &self.data_converter_id)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// All clients of one kind plus the default selection
#[derive(Debug)]
pub struct ClientSet {
    kind: ClientKind,
    clients: BTreeMap<String, Arc<ClientHandle>>,
    default_name: String,
}

impl ClientSet {
    pub fn kind(&self) -> ClientKind {
        self.kind
    }

    /// The process-wide default client of this kind
    pub fn default_client(&self) -> Option<&Arc<ClientHandle>> {
        self.clients.get(&self.default_name)
    }

    /// Id the default alias points at
    pub fn default_id(&self) -> Option<&str> {
        self.default_client().map(|client| client.id())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClientHandle>> {
        self.clients.get(name)
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<ClientHandle>> {
        self.clients.values().find(|client| client.id() == id)
    }

    /// Lookup by argument-style alias such as `barWorkflowClient`
    pub fn by_alias(&self, alias: &str) -> Option<&Arc<ClientHandle>> {
        self.clients
            .iter()
            .find(|(name, _)| self.kind.alias(name) == alias)
            .map(|(_, client)| client)
    }

    pub fn names(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClientHandle>> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Builds [`ClientSet`]s from configuration entries
pub struct ClientAssembler<'a> {
    data_converters: &'a NameRegistry<dyn DataConverter>,
    interceptors: &'a NameRegistry<dyn Interceptor>,
}

impl<'a> ClientAssembler<'a> {
    pub fn new(
        data_converters: &'a NameRegistry<dyn DataConverter>,
        interceptors: &'a NameRegistry<dyn Interceptor>,
    ) -> Self {
        Self {
            data_converters,
            interceptors,
        }
    }

    /// Build every client of `kind`; `default_name` must match an entry
    pub fn assemble(
        &self,
        kind: ClientKind,
        entries: &BTreeMap<String, ClientConfig>,
        default_name: &str,
    ) -> AssemblyResult<ClientSet> {
        if !entries.contains_key(default_name) {
            return Err(AssemblyError::unresolved(kind.reference_kind(), default_name));
        }

        let mut clients = BTreeMap::new();
        for (name, config) in entries {
            let client = self.build_client(kind, name, config)?;
            debug!(
                client_id = %client.id,
                address = %client.service_client.address(),
                tls = client.service_client.is_tls(),
                "Assembled client"
            );
            clients.insert(name.clone(), Arc::new(client));
        }

        info!(
            kind = ?kind,
            count = clients.len(),
            default = %default_name,
            "Client assembly complete"
        );

        Ok(ClientSet {
            kind,
            clients,
            default_name: default_name.to_string(),
        })
    }

    fn build_client(
        &self,
        kind: ClientKind,
        name: &str,
        config: &ClientConfig,
    ) -> AssemblyResult<ClientHandle> {
        let path = format!("{}.{name}", kind.config_section());

        let service_client = match config.tls_credentials() {
            Some((key, pem)) => ServiceClient::tls(&config.address, key, pem),
            None => ServiceClient::plain(&config.address),
        };

        let mut options = ClientOptions::new().with_namespace(&config.namespace);
        if let Some(identity) = config.identity.as_deref().filter(|i| !i.is_empty()) {
            options = options.with_identity(identity);
        }
        if let Some(condition) = config.query_rejection_condition {
            options = options.with_query_rejection_condition(condition);
        }

        let pipeline = InterceptorPipeline::new(self.interceptors.resolve_all(&config.interceptors)?);
        let data_converter = self.data_converters.resolve(&config.data_converter)?;

        let retry_policy = match &config.grpc_context.retry_options {
            Some(retry) => {
                let retry_path = format!("{path}.grpcContext.retryOptions");
                Some(RetryPolicy {
                    initial_interval: retry.initial_interval(&retry_path)?,
                    maximum_interval: retry.maximum_interval(&retry_path)?,
                    backoff_coefficient: retry.backoff_coefficient,
                    maximum_attempts: retry.maximum_attempts,
                    non_retryable_exceptions: retry.non_retryable_exceptions.clone(),
                })
            }
            None => None,
        };

        Ok(ClientHandle {
            id: kind.id(name),
            name: name.to_string(),
            kind,
            service_client,
            options,
            data_converter_id: config.data_converter.clone(),
            data_converter,
            pipeline,
            grpc_context: GrpcContext {
                timeout: config.grpc_context.timeout.duration(),
                options: config.grpc_context.options.clone(),
                metadata: config.grpc_context.metadata.clone(),
                retry_policy,
            },
        })
    }
}
